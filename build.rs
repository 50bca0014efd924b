//! Build script for vidtex-core
//!
//! This script:
//! 1. Locates FFmpeg libraries using pkg-config (only with the `ffmpeg` feature)
//! 2. Generates the C header using cbindgen

use std::env;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=src/");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    // Get build configuration
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");

    // The viddecode backend is loaded at runtime and needs no link step
    if env::var_os("CARGO_FEATURE_FFMPEG").is_some() {
        find_ffmpeg_libs();
    }

    // Generate C header
    generate_header(&manifest_dir, &out_dir);
}

/// Find FFmpeg libraries using pkg-config or fallback paths
fn find_ffmpeg_libs() {
    let libs = ["libavcodec", "libavformat", "libavutil", "libswscale"];

    let mut found_all = true;
    for lib in &libs {
        match pkg_config::Config::new().atleast_version("58.0.0").probe(lib) {
            Ok(library) => {
                println!("cargo:info=Found {} via pkg-config", lib);
                for path in &library.link_paths {
                    println!("cargo:rustc-link-search=native={}", path.display());
                }
            }
            Err(e) => {
                println!("cargo:warning=pkg-config failed for {}: {}", lib, e);
                found_all = false;
            }
        }
    }

    if !found_all {
        try_fallback_paths();
    }
}

/// Try common FFmpeg installation paths
fn try_fallback_paths() {
    let lib_paths = [
        "/usr/lib/x86_64-linux-gnu",
        "/usr/lib64",
        "/usr/local/lib",
        "/opt/homebrew/opt/ffmpeg/lib",
        "/opt/homebrew/lib",
        "/usr/local/opt/ffmpeg/lib",
    ];

    for path in &lib_paths {
        if Path::new(path).exists() {
            println!("cargo:rustc-link-search=native={}", path);
            println!("cargo:info=Added link path: {}", path);
        }
    }

    println!("cargo:rustc-link-lib=dylib=avcodec");
    println!("cargo:rustc-link-lib=dylib=avformat");
    println!("cargo:rustc-link-lib=dylib=avutil");
    println!("cargo:rustc-link-lib=dylib=swscale");
}

/// Generate C header using cbindgen
fn generate_header(manifest_dir: &str, out_dir: &str) {
    let crate_dir = PathBuf::from(manifest_dir);
    let config_path = crate_dir.join("cbindgen.toml");
    let header_out = PathBuf::from(out_dir).join("vidtex_core.h");

    let config = if config_path.exists() {
        cbindgen::Config::from_file(&config_path).unwrap_or_default()
    } else {
        cbindgen::Config::default()
    };

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(&header_out);
            println!("cargo:info=Generated header: {}", header_out.display());
        }
        Err(e) => {
            println!("cargo:warning=cbindgen failed: {}", e);
            create_fallback_header(&header_out);
        }
    }
}

/// Create a minimal fallback header if cbindgen fails
fn create_fallback_header(header_path: &Path) {
    let header_content = r#"
#ifndef VIDTEX_CORE_H
#define VIDTEX_CORE_H

#include <stdint.h>
#include <stdbool.h>

// Note: This is a fallback header. Build with cbindgen for full API.

typedef enum {
    VtxResultSuccess = 0,
    VtxResultErrorFileNotFound = 1,
    VtxResultErrorOpenFailed = 2,
    VtxResultErrorConversion = 3,
    VtxResultErrorMemory = 4,
    VtxResultErrorLibrary = 5,
    VtxResultErrorGraphics = 6,
    VtxResultErrorInvalidHandle = 7,
    VtxResultErrorInvalidConfig = 8,
    VtxResultErrorUnknown = 99,
} VtxResult;

typedef struct VtxVideoTextureHandle VtxVideoTextureHandle;

typedef const void* (*VtxGlLoader)(const char* name, void* user_data);

typedef struct {
    uint64_t frames_delivered;
    uint64_t empty_pulls;
    uint64_t exhausted_ticks;
    uint64_t frames_uploaded;
} VtxStreamStats;

// Error handling
const char* vtx_get_last_error(void);
void vtx_clear_last_error(void);

// Library
void vtx_init(void);
const char* vtx_get_version(void);

// Lifecycle
VtxVideoTextureHandle* vtx_video_texture_create(const char* path, VtxGlLoader loader,
                                                void* user_data);
VtxVideoTextureHandle* vtx_video_texture_create_with_library(const char* library_path,
                                                             const char* path,
                                                             VtxGlLoader loader,
                                                             void* user_data);
void vtx_video_texture_destroy(VtxVideoTextureHandle* handle);

// Per-tick
VtxResult vtx_video_texture_advance(VtxVideoTextureHandle* handle, bool* out_advanced);
uint32_t vtx_video_texture_get_texture(const VtxVideoTextureHandle* handle);
uint32_t vtx_video_texture_get_width(const VtxVideoTextureHandle* handle);
uint32_t vtx_video_texture_get_height(const VtxVideoTextureHandle* handle);
void vtx_video_texture_get_stats(const VtxVideoTextureHandle* handle,
                                 VtxStreamStats* out_stats);

#endif // VIDTEX_CORE_H
"#;

    std::fs::write(header_path, header_content).expect("Failed to write fallback header");
    println!("cargo:info=Created fallback header: {}", header_path.display());
}
