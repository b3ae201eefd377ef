fn main() {
    if let Err(err) = subdivision_tree_viz::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
