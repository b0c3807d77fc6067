fn main() {
    if let Err(error) = taskai_timer::run() {
        eprintln!("taskai-timer: {error}");
        std::process::exit(1);
    }
}
