use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = [
    "FFMPEG_DIR",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

/// ffmpeg-sys-next finds FFmpeg through pkg-config on Unix. On Windows it
/// needs FFMPEG_DIR or a vcpkg install, so point the user at whichever is
/// missing.
fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    if let Some(directory) = env::var_os("FFMPEG_DIR") {
        let directory = PathBuf::from(directory);
        if !directory.join("include").join("libavcodec").is_dir() {
            println!(
                "cargo:warning=FFMPEG_DIR={} has no include/libavcodec; framesift needs the FFmpeg development headers.",
                directory.display(),
            );
        }
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framesift links FFmpeg; set FFMPEG_DIR, or install ffmpeg through vcpkg and set VCPKG_ROOT."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    report_vcpkg_install(&Path::new(&vcpkg_root).join("installed").join(&triplet));
}

fn report_vcpkg_install(installed: &Path) {
    if !installed.join("lib").join("avcodec.lib").exists() {
        println!(
            "cargo:warning=No vcpkg FFmpeg found at {}; run `vcpkg install ffmpeg` for this triplet.",
            installed.display(),
        );
        return;
    }

    println!(
        "cargo:warning=Using vcpkg FFmpeg at {}. Set FFMPEG_DIR={} to silence this message.",
        installed.display(),
        installed.display(),
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 if this is a dynamic (DLL) FFmpeg build.");
    }
}
