use num_traits::PrimInt;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter, FromRepr, VariantNames};

use crate::constants::NUM_ZERNIKE_MODE;

/// A trait to provide value and bit value methods for the bit enum.
pub trait BitEnum<T: PrimInt> {
    /// Get the value.
    ///
    /// # Returns
    /// Value.
    fn value(&self) -> T;

    /// Get the bit value.
    ///
    /// # Returns
    /// Bit value. If the value is not defined, it returns 0.
    fn bit_value(&self) -> T {
        match self.value().to_usize() {
            Some(value) => T::one() << value,
            None => T::zero(),
        }
    }
}

impl BitEnum<u32> for ZernikeMode {
    fn value(&self) -> u32 {
        *self as u32
    }
}

/// Zernike mode supported by the driver. The discriminant is the bit position
/// in the mode selector field. The comment is the Zernike index.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, Hash, Eq, EnumIter, VariantNames)]
#[repr(u8)]
pub enum ZernikeMode {
    // Z4
    Ast45,
    // Z5
    Defocus,
    // Z6
    Ast0,
    // Z7
    TrefoilY,
    // Z8
    ComaX,
    // Z9
    ComaY,
    // Z10
    TrefoilX,
    // Z11
    TetrafoilY,
    // Z12
    SecondaryAstY,
    // Z13
    SphericalAberration3,
    // Z14
    SecondaryAstX,
    // Z15
    TetrafoilX,
}

impl ZernikeMode {
    /// Mask that selects all the modes.
    pub const ALL_MASK: u32 = (1 << NUM_ZERNIKE_MODE) - 1;

    /// Get the human-readable name.
    ///
    /// # Returns
    /// Display name of the mode.
    pub fn name(&self) -> &'static str {
        match self {
            ZernikeMode::Ast45 => "Astigmatism 45",
            ZernikeMode::Defocus => "Defocus",
            ZernikeMode::Ast0 => "Astigmatism 0",
            ZernikeMode::TrefoilY => "Trefoil-Y",
            ZernikeMode::ComaX => "Coma-X",
            ZernikeMode::ComaY => "Coma-Y",
            ZernikeMode::TrefoilX => "Trefoil-X",
            ZernikeMode::TetrafoilY => "Tetrafoil-Y",
            ZernikeMode::SecondaryAstY => "Secondary Astigmatism-Y",
            ZernikeMode::SphericalAberration3 => "Spherical Aberration 3rd",
            ZernikeMode::SecondaryAstX => "Secondary Astigmatism-X",
            ZernikeMode::TetrafoilX => "Tetrafoil-X",
        }
    }

    /// Get the Zernike index in the Noll-like numbering used by the vendor
    /// (Z4 to Z15).
    pub fn zernike_index(&self) -> u32 {
        self.value() + 4
    }

    /// Get the enum from the bit value.
    ///
    /// # Arguments
    /// * `bit_value` - Bit value with a single bit set.
    ///
    /// # Returns
    /// Enum value. None if no bit or more than one bit is set.
    pub fn from_bit_value(bit_value: u32) -> Option<ZernikeMode> {
        let modes: Vec<ZernikeMode> = ZernikeMode::iter()
            .filter(|mode| bit_value & mode.bit_value() != 0)
            .collect();

        if (modes.len() == 1) && (bit_value & !Self::ALL_MASK == 0) {
            Some(modes[0])
        } else {
            None
        }
    }

    /// Get the mask of the modes.
    ///
    /// # Arguments
    /// * `modes` - Modes to select.
    ///
    /// # Returns
    /// Mode mask.
    pub fn mask(modes: &[ZernikeMode]) -> u32 {
        modes.iter().fold(0, |acc, mode| acc | mode.bit_value())
    }

    /// Get the modes selected by the mask, from the lowest to the highest
    /// bit.
    ///
    /// # Arguments
    /// * `mask` - Mode mask.
    ///
    /// # Returns
    /// Selected modes.
    pub fn from_mask(mask: u32) -> Vec<ZernikeMode> {
        ZernikeMode::iter()
            .filter(|mode| mask & mode.bit_value() != 0)
            .collect()
    }
}

/// Part of the device to relax.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, Default, AsRefStr)]
#[repr(u32)]
pub enum RelaxPart {
    MirrorOnly = 0,
    TiltArmsOnly = 1,
    #[default]
    Both = 2,
}

/// State of the controller.
#[derive(FromRepr, Debug, PartialEq, Clone, Copy, AsRefStr)]
#[repr(u8)]
pub enum ControllerState {
    Uninitialized = 1,
    Initialized = 2,
    Disconnected = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::VariantNames;

    #[test]
    fn test_zernike_mode_value() {
        assert_eq!(ZernikeMode::Ast45.value(), 0);
        assert_eq!(ZernikeMode::Defocus.value(), 1);
        assert_eq!(ZernikeMode::TetrafoilX.value(), 11);

        assert_eq!(ZernikeMode::from_repr(5).unwrap(), ZernikeMode::ComaY);
        assert!(ZernikeMode::from_repr(12).is_none());
    }

    #[test]
    fn test_zernike_mode_bit_value() {
        assert_eq!(ZernikeMode::Ast45.bit_value(), 0x001);
        assert_eq!(ZernikeMode::Defocus.bit_value(), 0x002);
        assert_eq!(ZernikeMode::ComaX.bit_value(), 0x010);
        assert_eq!(ZernikeMode::TetrafoilX.bit_value(), 0x800);

        assert_eq!(ZernikeMode::ALL_MASK, 0xFFF);
    }

    #[test]
    fn test_zernike_mode_name() {
        assert_eq!(ZernikeMode::Defocus.name(), "Defocus");
        assert_eq!(ZernikeMode::ComaX.name(), "Coma-X");

        assert_eq!(ZernikeMode::Ast45.zernike_index(), 4);
        assert_eq!(ZernikeMode::TetrafoilX.zernike_index(), 15);

        assert_eq!(ZernikeMode::VARIANTS.len(), NUM_ZERNIKE_MODE);
    }

    #[test]
    fn test_zernike_mode_from_bit_value() {
        assert_eq!(
            ZernikeMode::from_bit_value(0x002).unwrap(),
            ZernikeMode::Defocus
        );
        assert_eq!(
            ZernikeMode::from_bit_value(0x800).unwrap(),
            ZernikeMode::TetrafoilX
        );

        assert!(ZernikeMode::from_bit_value(0).is_none());
        assert!(ZernikeMode::from_bit_value(0x003).is_none());
        assert!(ZernikeMode::from_bit_value(0x1000).is_none());
    }

    #[test]
    fn test_zernike_mode_mask() {
        assert_eq!(ZernikeMode::mask(&[]), 0);
        assert_eq!(
            ZernikeMode::mask(&[ZernikeMode::Defocus, ZernikeMode::ComaX]),
            0x012
        );

        let all: Vec<ZernikeMode> = ZernikeMode::iter().collect();
        assert_eq!(ZernikeMode::mask(&all), ZernikeMode::ALL_MASK);

        assert_eq!(
            ZernikeMode::from_mask(0x012),
            vec![ZernikeMode::Defocus, ZernikeMode::ComaX]
        );
        assert_eq!(ZernikeMode::from_mask(ZernikeMode::ALL_MASK), all);
    }

    #[test]
    fn test_relax_part() {
        assert_eq!(RelaxPart::default(), RelaxPart::Both);

        assert_eq!(RelaxPart::MirrorOnly as u32, 0);
        assert_eq!(RelaxPart::TiltArmsOnly as u32, 1);
        assert_eq!(RelaxPart::Both as u32, 2);

        assert_eq!(RelaxPart::from_repr(1).unwrap(), RelaxPart::TiltArmsOnly);
        assert!(RelaxPart::from_repr(3).is_none());
    }

    #[test]
    fn test_controller_state() {
        assert_eq!(ControllerState::Initialized.as_ref(), "Initialized");
        assert_eq!(
            ControllerState::from_repr(3).unwrap(),
            ControllerState::Disconnected
        );
    }
}
