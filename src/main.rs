use log::{debug, info};
use pixelcart::app::{AppContext, Mode};
use pixelcart::cartridge::Cartridge;
use pixelcart::config::Config;
use pixelcart::display_manager::create_frontend;
use pixelcart::manifest::Manifest;
use pixelcart::marker;
use pixelcart::observer::{board_lines, status_line};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HEADLESS_FRAMES: u32 = 100;

fn usage(program: &str) {
    println!("pixelcart - runnable cartridges inside JPEG images");
    println!();
    println!("Usage:");
    println!("  {} [--config file.toml] build <base.jpg> <manifest.toml> <out.jpg>", program);
    println!("  {} [--config file.toml] inspect <file.jpg>", program);
    println!("  {} [--config file.toml] play <file.jpg> [--frames N]", program);
    println!();
    println!("Config is read from --config, then $PIXELCART_CONFIG, then built-in defaults.");
    println!("--frames only applies when no interactive terminal is available.");
}

fn read_file(path: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    fs::read(path).map_err(|e| format!("Cannot read '{}': {}", path, e).into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config_path: Option<PathBuf> = None;
    if args.len() >= 2 && args[0] == "--config" {
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    // No subcommand is a request for help, not an error
    let Some(command) = args.first().cloned() else {
        usage(&program);
        return Ok(());
    };

    let config = Config::load(config_path.as_deref())?;
    debug!("Config: {:?}", config);

    match (command.as_str(), &args[1..]) {
        ("build", [base, manifest, out]) => build(base, manifest, out),
        ("inspect", [file]) => inspect(file, &config),
        ("play", [file]) => play(file, config, DEFAULT_HEADLESS_FRAMES),
        ("play", [file, flag, n]) if flag == "--frames" => {
            let frames = n
                .parse()
                .map_err(|_| format!("Invalid frame count: {}", n))?;
            play(file, config, frames)
        }
        _ => {
            usage(&program);
            std::process::exit(2);
        }
    }
}

fn build(base: &str, manifest: &str, out: &str) -> Result<(), Box<dyn std::error::Error>> {
    let jpeg = read_file(base)?;
    let text = fs::read_to_string(manifest)
        .map_err(|e| format!("Cannot read manifest '{}': {}", manifest, e))?;
    let cart = Manifest::from_toml_str(&text)?.to_cartridge()?;

    let output = cart.write_into_jpeg(&jpeg)?;
    fs::write(Path::new(out), &output)?;
    info!(
        "Wrote {} ({} bytes, {} added)",
        out,
        output.len(),
        output.len() as i64 - jpeg.len() as i64
    );
    Ok(())
}

fn inspect(file: &str, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let jpeg = read_file(file)?;
    let blocks = match marker::extract(&jpeg, config.limits.max_cartridge_bytes) {
        Ok(blocks) => blocks,
        Err(e) => {
            println!("{}: not runnable ({:?}): {}", file, e.class(), e);
            return Ok(());
        }
    };

    println!("{}: {} cartridge block(s)", file, blocks.len());
    for block in &blocks {
        println!(
            "  {:<12} v{} flags={:#04x} {} bytes",
            block.block_type.name(),
            block.version,
            block.flags.bits(),
            block.payload.len()
        );
    }

    match Cartridge::from_blocks(&blocks) {
        Ok(cart) => {
            println!();
            print!("{}", cart.header);
            println!("bytecode:     {} bytes", cart.bytecode.len());
            if let Some(table) = &cart.truth_table {
                println!("truth table:  {} regions", table.len());
            }
            if let Some(strings) = &cart.string_table {
                for (key, value) in strings.iter() {
                    println!("string:       {} = {:?}", key, value);
                }
            }
        }
        Err(e) => println!("not runnable ({:?}): {}", e.class(), e),
    }
    Ok(())
}

fn play(file: &str, config: Config, headless_frames: u32) -> Result<(), Box<dyn std::error::Error>> {
    let jpeg = read_file(file)?;
    let frame = Duration::from_millis(config.display.frame_ms);
    let mut frontend = create_frontend(config.display.mode, headless_frames)?;

    let mut app = AppContext::open(&jpeg, config, frontend.observer());
    if let Mode::Inert(e) = app.mode() {
        drop(frontend);
        println!("{}: plain image, nothing to run ({:?}: {})", file, e.class(), e);
        return Ok(());
    }

    let host_commands = app.run(frontend.as_mut(), frame)?;
    // Leave the alternate screen before printing
    drop(frontend);

    if let Some(game) = app.interpreter().and_then(|i| i.game()) {
        for line in board_lines(game) {
            println!("{}", line);
        }
        println!("{}", status_line(game));
    }
    for host in host_commands {
        println!("host command not supported by this frontend: {:?}", host);
    }
    Ok(())
}
