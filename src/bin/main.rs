fn main() {
    para::main();
}
