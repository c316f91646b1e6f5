mod demo_scenes;

fn main() {
    if let Err(err) = wgpu_deferred::run("wgpu deferred", Box::new(demo_scenes::showcase)) {
        eprintln!("Application error: {err}");
        std::process::exit(1);
    }
}
