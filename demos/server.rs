#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use attach_listener::{
        attach::DefaultAttacher,
        channel::unix_socket::UnixSocketTransport,
        config::ListenerConfig,
        dispatcher::Dispatcher,
        operate::{listener::AttachListener, registry::CommandRegistry},
    };

    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ListenerConfig::load(path)?,
        None => ListenerConfig::default(),
    };

    println!("PID: {}", std::process::id());

    let mut registry = CommandRegistry::with_builtins();
    registry.register_command("uptime", {
        let started = std::time::Instant::now();
        move |_: &[String], out: &mut String| {
            out.push_str(&format!("{:?}", started.elapsed()));
            0
        }
    });

    let dispatcher = Arc::new(Dispatcher::new(UnixSocketTransport, config));
    let listener =
        AttachListener::start(dispatcher, registry)?.with_trigger::<DefaultAttacher>()?;

    std::thread::sleep(std::time::Duration::from_secs(60));

    listener.shutdown();

    Ok(())
}

#[cfg(not(unix))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}
