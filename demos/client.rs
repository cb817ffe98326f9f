#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::env::args;

    use attach_listener::{
        attach::{client::execute, DefaultAttacher},
        config::ListenerConfig,
    };

    env_logger::init();

    let mut args = args();
    args.next();
    let pid: u32 = args.next().ok_or("PID missing")?.parse()?;
    let command = args.next().unwrap_or_else(|| "properties".to_owned());
    let command_args = args.collect::<Vec<_>>();
    let command_args = command_args.iter().map(String::as_str).collect::<Vec<_>>();

    let reply = async_io::block_on(execute::<DefaultAttacher>(
        pid,
        &ListenerConfig::default(),
        &command,
        &command_args,
    ))?;

    println!("{}", reply.output);

    if reply.result != 0 {
        eprintln!("Result: {}", reply.result);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(not(unix))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}
