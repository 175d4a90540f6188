// MindSet Core - Rust metronome engine
// Procedural tick synthesis, drift-free tempo scheduling, beat-synced theming

// Module declarations
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod synth;
pub mod tempo;
pub mod theme;

// Re-exports for convenience
pub use api::*;

#[cfg(target_os = "android")]
use log::info;

/// Initialize Android logging through logcat
#[cfg(target_os = "android")]
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    match tracing_android::layer("MindSetMastery") {
        Ok(layer) => {
            let _ = tracing_subscriber::registry().with(layer).try_init();
        }
        Err(err) => eprintln!("[Logging] logcat layer unavailable: {}", err),
    }
}

/// Initialize stderr logging for desktop hosts and the CLI
///
/// Safe to call more than once; only the first call installs a subscriber.
#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

/// JNI_OnLoad is called when the native library is loaded by Android
/// This function initializes the Android context required by oboe-rs
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: jni::JavaVM, _reserved: *mut std::ffi::c_void) -> jni::sys::jint {
    init_logging();

    info!("JNI_OnLoad called - initializing Android context");

    // SAFETY: the JavaVM pointer is valid for the lifetime of the process and
    // this runs before any Oboe stream is opened.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer() as *mut std::ffi::c_void,
            std::ptr::null_mut(),
        );
    }

    info!("Android context initialized successfully");

    jni::sys::JNI_VERSION_1_6
}
