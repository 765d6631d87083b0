use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("epucklink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: epucklink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("build_target: {}", env!("EPUCKLINK_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!(
        "wire: marker={} chunk={} image={}x{}",
        String::from_utf8_lossy(epucklink_frame::MARKER),
        epucklink_frame::DEFAULT_CHUNK_SIZE,
        epucklink_frame::IMAGE_WIDTH,
        epucklink_frame::IMAGE_HEIGHT
    );

    Ok(SUCCESS)
}
