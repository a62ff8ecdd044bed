use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::terminal;
use edos_disk::{ArchiveStore, VirtualFs};
use edos_shell::config::Config;
use edos_shell::error::report;
use edos_shell::keys::TerminalKeys;
use edos_shell::launcher::HeaderDetector;
use edos_shell::macros::MacroRegistry;
use edos_shell::{logging, signals, Shell, ShellError, ShellSession};
use tracing::{debug, info};

struct Options {
    use_disk_folder: bool,
    no_save: bool,
    verbose: bool,
    root: Option<PathBuf>,
}

fn print_help() {
    println!("edos: shell for the eDOS virtual disk");
    println!();
    println!("Usage:");
    println!("  edos [options]");
    println!();
    println!("Options:");
    println!("  --use-disk-folder  Work in the uncompressed disk folder instead of the archive");
    println!("  --root <dir>       Install root holding the archive and modules/");
    println!("  --no-save          Discard changes on exit");
    println!("  --verbose          Log debug output to stderr");
    println!("  --version          Print version");
    println!("  --help             Print this help");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        use_disk_folder: false,
        no_save: false,
        verbose: false,
        root: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--use-disk-folder" => options.use_disk_folder = true,
            "--no-save" => options.no_save = true,
            "--verbose" | "-v" => options.verbose = true,
            "--root" => match iter.next() {
                Some(dir) => options.root = Some(PathBuf::from(dir)),
                None => return Err("--root needs a directory".to_string()),
            },
            other => return Err(format!("unknown option '{other}'")),
        }
    }
    Ok(options)
}

fn main() {
    // Restore the terminal before the default hook prints
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = terminal::disable_raw_mode();
        default_hook(info);
    }));

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("edos {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let options = match parse_args(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("hint: edos --help");
            process::exit(2);
        }
    };

    logging::init(options.verbose);

    let mut config = Config::load_or_default();
    if options.use_disk_folder {
        config.disk.use_disk_folder = true;
    }

    if let Err(e) = run(&config, &options) {
        eprintln!("error: {}", report(&e));
        process::exit(1);
    }
}

fn run(config: &Config, options: &Options) -> Result<(), ShellError> {
    let install_root = options
        .root
        .clone()
        .unwrap_or_else(|| config.disk.resolve_root());
    std::fs::create_dir_all(&install_root)?;

    let store = ArchiveStore::open(config.disk.store_options(&install_root))?;
    info!(
        root = %store.root().display(),
        folder_mode = store.is_folder_mode(),
        "disk ready"
    );
    let vfs = VirtualFs::new(store.root());
    let store = Arc::new(Mutex::new(store));
    signals::install_exit_hooks(&store)?;

    let session = ShellSession::from_config(
        vfs,
        MacroRegistry::builtin(),
        Box::new(io::stdout()),
        config,
        &install_root,
    );
    let mut shell = Shell::new(session, TerminalKeys::new(), Box::new(HeaderDetector));

    let result = match shell.run() {
        Err(ShellError::Interrupted) => {
            debug!("interrupted, leaving");
            Ok(())
        }
        other => other,
    };

    let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
    if options.no_save {
        store.discard()?;
    } else {
        store.shutdown()?;
    }
    result
}
