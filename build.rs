fn main() {
    // Shaders are embedded with include_str!; rebuild when they change.
    println!("cargo:rerun-if-changed=shaders/integrate.wgsl");
    println!("cargo:rerun-if-changed=shaders/points.wgsl");
}
