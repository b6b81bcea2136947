//! Named screen anchors for the marketplace UI.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ConfigError;
use super::types::Coordinate;

/// The fixed UI locations the engine may need to click or read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnchorRole {
    TradeEntry,
    MainTab,
    EquipmentTab,
    PurchaseButton,
    MaxQuantityButton,
    PricePrimary,
    PriceSecondary,
}

impl AnchorRole {
    /// Every role, in the order they are offered for capture.
    pub const ALL: [AnchorRole; 7] = [
        AnchorRole::TradeEntry,
        AnchorRole::MainTab,
        AnchorRole::EquipmentTab,
        AnchorRole::PurchaseButton,
        AnchorRole::MaxQuantityButton,
        AnchorRole::PricePrimary,
        AnchorRole::PriceSecondary,
    ];

    /// Key used in the persisted session document.
    pub fn key(&self) -> &'static str {
        match self {
            Self::TradeEntry => "trade_button",
            Self::MainTab => "main_button",
            Self::EquipmentTab => "equipment_button",
            Self::PurchaseButton => "purchase_button",
            Self::MaxQuantityButton => "max_quantity_button",
            Self::PricePrimary => "price_primary",
            Self::PriceSecondary => "price_secondary",
        }
    }

    /// Human-readable label shown to the operator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TradeEntry => "Trade entry button",
            Self::MainTab => "Main tab",
            Self::EquipmentTab => "Equipment tab",
            Self::PurchaseButton => "Purchase button",
            Self::MaxQuantityButton => "Max quantity button",
            Self::PricePrimary => "Primary price box",
            Self::PriceSecondary => "Secondary price box",
        }
    }
}

impl fmt::Display for AnchorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role → optional coordinate. Unset anchors are never defaulted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorSet {
    #[serde(default)]
    pub trade_button: Option<Coordinate>,
    #[serde(default)]
    pub main_button: Option<Coordinate>,
    #[serde(default)]
    pub equipment_button: Option<Coordinate>,
    #[serde(default)]
    pub purchase_button: Option<Coordinate>,
    #[serde(default)]
    pub max_quantity_button: Option<Coordinate>,
    #[serde(default)]
    pub price_primary: Option<Coordinate>,
    #[serde(default)]
    pub price_secondary: Option<Coordinate>,
}

impl AnchorSet {
    pub fn get(&self, role: AnchorRole) -> Option<Coordinate> {
        *self.slot(role)
    }

    pub fn set(&mut self, role: AnchorRole, coordinate: Coordinate) {
        *self.slot_mut(role) = Some(coordinate);
    }

    pub fn clear(&mut self, role: AnchorRole) {
        *self.slot_mut(role) = None;
    }

    /// Returns the anchor or a `MissingAnchor` error naming the role.
    pub fn require(&self, role: AnchorRole) -> Result<Coordinate, ConfigError> {
        self.get(role).ok_or(ConfigError::MissingAnchor(role))
    }

    /// Roles without a coordinate, in capture order.
    pub fn missing(&self) -> Vec<AnchorRole> {
        AnchorRole::ALL
            .into_iter()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }

    fn slot(&self, role: AnchorRole) -> &Option<Coordinate> {
        match role {
            AnchorRole::TradeEntry => &self.trade_button,
            AnchorRole::MainTab => &self.main_button,
            AnchorRole::EquipmentTab => &self.equipment_button,
            AnchorRole::PurchaseButton => &self.purchase_button,
            AnchorRole::MaxQuantityButton => &self.max_quantity_button,
            AnchorRole::PricePrimary => &self.price_primary,
            AnchorRole::PriceSecondary => &self.price_secondary,
        }
    }

    fn slot_mut(&mut self, role: AnchorRole) -> &mut Option<Coordinate> {
        match role {
            AnchorRole::TradeEntry => &mut self.trade_button,
            AnchorRole::MainTab => &mut self.main_button,
            AnchorRole::EquipmentTab => &mut self.equipment_button,
            AnchorRole::PurchaseButton => &mut self.purchase_button,
            AnchorRole::MaxQuantityButton => &mut self.max_quantity_button,
            AnchorRole::PricePrimary => &mut self.price_primary,
            AnchorRole::PriceSecondary => &mut self.price_secondary,
        }
    }
}
