use std::io::{BufRead, Write};
use std::thread;

use buffered_proxy_listener::{Connection, ListenerBuilder, Listener};
use clap::Parser;
use log::{debug, info, warn};


/// Line echo server that reports who it thinks it is talking to
#[derive(Debug, Parser)]
#[command(name = "echo_server", version)]
struct Args {
    /// Address to bind to
    #[arg(short = 'B', long, value_name = "LISTEN_ADDRESS", default_value = "127.0.0.1:2020")]
    bind: String,

    /// Size of each pooled read/write buffer, in bytes
    #[arg(long, default_value_t = buffered_proxy_listener::DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Expect (but do not require) a PROXY v1 header from clients
    #[arg(long)]
    proxy: bool,
}


fn serve<C: Connection + 'static>(mut conn: C) {
    let client = match conn.remote_addr() {
        Ok(addr) => addr.to_string(),
        Err(_) => return,
    };
    thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            let rw = match conn.read_writer() {
                Ok(rw) => rw,
                Err(_) => break,
            };
            match rw.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("read from {} failed: {}", client, e);
                    break;
                }
            }
            if write!(rw, "{} said: {}", client, line).and_then(|_| rw.flush()).is_err() {
                break;
            }
        }
        debug!("{} went away", client);
        let _ = conn.close();
    });
}

fn run<L: Listener>(listener: L) -> !
    where L::Conn: 'static
{
    for conn in listener.incoming() {
        match conn {
            Ok(conn) => serve(conn),
            Err(e) => warn!("accept failed: {}", e),
        }
    }
    unreachable!("incoming() never ends")
}


fn main() {
    env_logger::init();
    let args = Args::parse();

    let builder = ListenerBuilder::new().buffer_size(args.buffer_size);
    info!("listening on {} (proxy protocol: {})", args.bind, args.proxy);
    if args.proxy {
        let listener = builder.bind_proxy(&args.bind[..]).unwrap_or_else(|e| {
            eprintln!("listen failed - {}", e);
            std::process::exit(1);
        });
        run(listener)
    } else {
        let listener = builder.bind(&args.bind[..]).unwrap_or_else(|e| {
            eprintln!("listen failed - {}", e);
            std::process::exit(1);
        });
        run(listener)
    }
}
