fn main() -> anyhow::Result<()> {
    mtfkit::cli::run_cli()
}
