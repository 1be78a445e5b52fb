// The DMP40 has 40 segments and 3 tilt arms.
pub const MOCK_NUM_SEGMENT: u32 = 40;
pub const MOCK_NUM_TILT: u32 = 3;

pub const MOCK_RELAX_STEPS: i32 = 5;

pub const MOCK_SESSION_HANDLE: u32 = 0x1000;
pub const MOCK_DEVICE_RESOURCE_NAME: &str = "USB0::0x1313::0x8070::M00000001::INSTR";
