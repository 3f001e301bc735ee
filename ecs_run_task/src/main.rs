mod cli;
mod conf;
mod launcher;
mod scheduler;

use human_panic::setup_panic;

#[tokio::main]
async fn main() {
    setup_panic!();

    match cli::init().await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{:?}", e);
            std::process::exit(1)
        }
    }
}
