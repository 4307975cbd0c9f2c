fn main() {
    if let Err(err) = sheet_infer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
