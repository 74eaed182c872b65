use super::names::{self, NameTable};

/// GPU architecture generation, selects the counter mapping table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    Midgard,
    Bifrost,
}

/// A known Mali product.
#[derive(Debug)]
pub struct Product {
    /// Bits of the product id that identify the product.
    pub mask: u32,
    pub id: u32,
    pub name: &'static str,
    pub family: Family,
    pub names: &'static NameTable,
}

impl Product {
    pub fn matches(&self, product_id: u32) -> bool {
        product_id & self.mask == self.id
    }
}

const OLD_MASK: u32 = 0xffff;
const NEW_MASK: u32 = 0xf00f;

macro_rules! product {
    ($mask:expr, $id:expr, $name:literal, $family:ident, $names:expr) => {
        Product {
            mask: $mask,
            id: $id,
            name: $name,
            family: Family::$family,
            names: &$names,
        }
    };
}

#[rustfmt::skip]
pub static PRODUCTS: [Product; 14] = [
    product!(OLD_MASK, 0x6956, "T60x", Midgard, names::T60X),
    product!(OLD_MASK, 0x0620, "T62x", Midgard, names::T62X),
    product!(OLD_MASK, 0x0720, "T72x", Midgard, names::T72X),
    product!(OLD_MASK, 0x0750, "T76x", Midgard, names::T76X),
    product!(OLD_MASK, 0x0820, "T82x", Midgard, names::T82X),
    product!(OLD_MASK, 0x0830, "T83x", Midgard, names::T83X),
    product!(OLD_MASK, 0x0860, "T86x", Midgard, names::T86X),
    product!(OLD_MASK, 0x0880, "TFRx", Midgard, names::T88X),
    product!(NEW_MASK, 0x6000, "TMIx", Bifrost, names::TMIX),
    product!(NEW_MASK, 0x6001, "THEx", Bifrost, names::THEX),
    product!(NEW_MASK, 0x7000, "TSIx", Bifrost, names::TSIX),
    product!(NEW_MASK, 0x7001, "TNOx", Bifrost, names::TNOX),
    product!(NEW_MASK, 0x7002, "TGOx", Bifrost, names::TGOX),
    product!(NEW_MASK, 0x7003, "TDVx", Bifrost, names::TDVX),
];

/// Looks `product_id` up in [`PRODUCTS`].
pub fn identify(product_id: u32) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.matches(product_id))
}

/// Family of `product_id`, unknown products are assumed to be Bifrost or later.
pub fn family(product_id: u32) -> Family {
    identify(product_id).map_or(Family::Bifrost, |p| p.family)
}
