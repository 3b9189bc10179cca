fn main() {
    if let Err(err) = kbchat::cli::main() {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
}
