fn main() {
    if let Err(err) = course_filter_lib::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
