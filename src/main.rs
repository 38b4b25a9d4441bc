mod cli;
mod commands;
mod error;
mod logging;
mod sql2es;

fn main() {
    sql2es::paths::load_dotenv();

    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
