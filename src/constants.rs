pub const NUM_ZERNIKE_MODE: usize = 12;

// Zernike amplitudes are fractions of the full stroke.
pub const MIN_AMPLITUDE: f64 = -1.0;
pub const MAX_AMPLITUDE: f64 = 1.0;

// Size of the string buffers used by the device information query.
pub const DRIVER_BUFFER_SIZE: usize = 256;

// Default locations of the vendor libraries in the VISA installation.
pub const DEFAULT_LIBRARY_CORE: &str =
    "C:\\Program Files\\IVI Foundation\\VISA\\Win64\\Bin\\TLDFM_64.dll";
pub const DEFAULT_LIBRARY_EXTENDED: &str =
    "C:\\Program Files\\IVI Foundation\\VISA\\Win64\\Bin\\TLDFMX_64.dll";

// Upper bound of the follow-up relax steps after the first one.
pub const DEFAULT_MAX_RELAX_STEPS: u32 = 1000;
