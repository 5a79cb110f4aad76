fn main() {
    if let Err(err) = olist_etl::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
