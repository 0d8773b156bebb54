fn main() -> color_eyre::eyre::Result<()> {
    escbox::cli::main()
}
