//! Deal records
//!
//! A sales session tracks four independent records: the customer, the vehicle being
//! sold, an optional trade-in and the trade-in's lender. Each record only has fixed,
//! named attributes so merges can never widen its shape. At document-fill time the
//! records are flattened into one dictionary where non-customer keys carry a category
//! prefix (`vehicle_`, `tradeIn_`, `lender_`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace a piece of deal data belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Customer,
    Vehicle,
    TradeIn,
    Lender,
}

impl FieldCategory {
    /// All categories in flattening order
    pub const ALL: [FieldCategory; 4] = [
        FieldCategory::Customer,
        FieldCategory::Vehicle,
        FieldCategory::TradeIn,
        FieldCategory::Lender,
    ];

    /// Key prefix used in flattened form data
    pub fn key_prefix(&self) -> &'static str {
        match self {
            FieldCategory::Customer => "",
            FieldCategory::Vehicle => "vehicle_",
            FieldCategory::TradeIn => "tradeIn_",
            FieldCategory::Lender => "lender_",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldCategory::Customer => "customer",
            FieldCategory::Vehicle => "vehicle",
            FieldCategory::TradeIn => "trade_in",
            FieldCategory::Lender => "lender",
        }
    }

    /// Split a flattened key into its category and unprefixed key.
    ///
    /// Keys without a known prefix belong to the customer namespace.
    pub fn split_prefixed(key: &str) -> (FieldCategory, &str) {
        for category in [FieldCategory::Vehicle, FieldCategory::TradeIn, FieldCategory::Lender] {
            if let Some(rest) = key.strip_prefix(category.key_prefix()) {
                if !rest.is_empty() {
                    return (category, rest);
                }
            }
        }
        (FieldCategory::Customer, key)
    }

    /// Flattened key for an attribute of this category
    pub fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix(), key)
    }
}

impl std::fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! deal_record {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<String>,
            )+
        }

        impl $name {
            /// Attribute keys in declaration order
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            pub fn get(&self, key: &str) -> Option<&str> {
                match key {
                    $($key => self.$field.as_deref(),)+
                    _ => None,
                }
            }

            /// Write an attribute; returns false for keys the record does not have
            pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
                match key {
                    $($key => {
                        self.$field = Some(value.into());
                        true
                    })+
                    _ => false,
                }
            }

            pub fn has_key(key: &str) -> bool {
                Self::KEYS.contains(&key)
            }

            /// Present attributes in declaration order
            pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
                [$(($key, self.$field.as_deref())),+]
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|v| (key, v)))
            }

            pub fn is_empty(&self) -> bool {
                $(self.$field.is_none())&&+
            }
        }
    };
}

deal_record!(
    /// The customer under conversation
    CustomerRecord {
        first_name => "firstName",
        last_name => "lastName",
        address => "address",
        city => "city",
        state => "state",
        zip_code => "zipCode",
        email => "email",
        home_phone => "homePhone",
        cell_phone => "cellPhone",
    }
);

deal_record!(
    /// The vehicle being purchased
    VehicleRecord {
        vin => "vin",
        stock_number => "stockNumber",
        year => "year",
        make => "make",
        model => "model",
        miles => "miles",
    }
);

deal_record!(
    /// The customer's trade-in vehicle
    TradeInRecord {
        vin => "vin",
        year => "year",
        make => "make",
        model => "model",
        miles => "miles",
    }
);

deal_record!(
    /// Lender holding the trade-in's outstanding loan
    LenderRecord {
        name => "name",
        phone => "phone",
        address => "address",
        account_number => "accountNumber",
        payoff_amount => "payoffAmount",
        per_diem_amount => "perDiemAmount",
    }
);

/// All records owned by one sales session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRecord {
    #[serde(default)]
    pub customer: CustomerRecord,
    #[serde(default)]
    pub vehicle: VehicleRecord,
    #[serde(default)]
    pub trade_in: TradeInRecord,
    #[serde(default)]
    pub lender: LenderRecord,
    /// Registry fields that have no typed attribute, keyed by field id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl DealRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` names a typed attribute of `category`
    pub fn has_attribute(category: FieldCategory, key: &str) -> bool {
        match category {
            FieldCategory::Customer => CustomerRecord::has_key(key),
            FieldCategory::Vehicle => VehicleRecord::has_key(key),
            FieldCategory::TradeIn => TradeInRecord::has_key(key),
            FieldCategory::Lender => LenderRecord::has_key(key),
        }
    }

    pub fn get(&self, category: FieldCategory, key: &str) -> Option<&str> {
        match category {
            FieldCategory::Customer => self.customer.get(key),
            FieldCategory::Vehicle => self.vehicle.get(key),
            FieldCategory::TradeIn => self.trade_in.get(key),
            FieldCategory::Lender => self.lender.get(key),
        }
    }

    pub fn set(&mut self, category: FieldCategory, key: &str, value: impl Into<String>) -> bool {
        match category {
            FieldCategory::Customer => self.customer.set(key, value),
            FieldCategory::Vehicle => self.vehicle.set(key, value),
            FieldCategory::TradeIn => self.trade_in.set(key, value),
            FieldCategory::Lender => self.lender.set(key, value),
        }
    }

    fn entries_of(&self, category: FieldCategory) -> Vec<(&'static str, &str)> {
        match category {
            FieldCategory::Customer => self.customer.entries().collect(),
            FieldCategory::Vehicle => self.vehicle.entries().collect(),
            FieldCategory::TradeIn => self.trade_in.entries().collect(),
            FieldCategory::Lender => self.lender.entries().collect(),
        }
    }

    /// Flatten into form data.
    ///
    /// Empty values are dropped. Customer keys stay unprefixed, the other categories
    /// use their key prefix. Extras are emitted under their field id.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        for category in FieldCategory::ALL {
            for (key, value) in self.entries_of(category) {
                if !value.is_empty() {
                    data.insert(category.prefixed(key), value.to_string());
                }
            }
        }
        for (id, value) in &self.extras {
            if !value.is_empty() {
                data.entry(id.clone()).or_insert_with(|| value.clone());
            }
        }
        data
    }

    pub fn is_empty(&self) -> bool {
        self.customer.is_empty()
            && self.vehicle.is_empty()
            && self.trade_in.is_empty()
            && self.lender.is_empty()
            && self.extras.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_prefixed() {
        assert_eq!(
            FieldCategory::split_prefixed("vehicle_vin"),
            (FieldCategory::Vehicle, "vin")
        );
        assert_eq!(
            FieldCategory::split_prefixed("tradeIn_miles"),
            (FieldCategory::TradeIn, "miles")
        );
        assert_eq!(
            FieldCategory::split_prefixed("lender_name"),
            (FieldCategory::Lender, "name")
        );
        assert_eq!(
            FieldCategory::split_prefixed("firstName"),
            (FieldCategory::Customer, "firstName")
        );
        assert_eq!(
            FieldCategory::split_prefixed("vehicle_"),
            (FieldCategory::Customer, "vehicle_")
        );
    }

    #[test]
    fn test_record_set_rejects_unknown_keys() {
        let mut customer = CustomerRecord::default();
        assert!(customer.set("firstName", "Jane"));
        assert!(!customer.set("favoriteColor", "blue"));
        assert_eq!(customer.get("firstName"), Some("Jane"));
        assert_eq!(customer.first_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_flatten_prefixes_and_skips_empty() {
        let mut deal = DealRecord::new();
        deal.set(FieldCategory::Customer, "firstName", "Jane");
        deal.set(FieldCategory::Customer, "email", "");
        deal.set(FieldCategory::Vehicle, "make", "Honda");
        deal.set(FieldCategory::TradeIn, "vin", "1HGCM82633A004352");
        deal.set(FieldCategory::Lender, "payoffAmount", "$12,000.00");

        let data = deal.flatten();
        assert_eq!(data.get("firstName").map(String::as_str), Some("Jane"));
        assert!(!data.contains_key("email"));
        assert_eq!(data.get("vehicle_make").map(String::as_str), Some("Honda"));
        assert_eq!(
            data.get("tradeIn_vin").map(String::as_str),
            Some("1HGCM82633A004352")
        );
        assert_eq!(
            data.get("lender_payoffAmount").map(String::as_str),
            Some("$12,000.00")
        );
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let mut deal = DealRecord::new();
        deal.set(FieldCategory::Customer, "zipCode", "43215");
        let json = serde_json::to_value(&deal).unwrap();
        assert_eq!(json["customer"]["zipCode"], "43215");
        assert!(json["customer"].get("firstName").is_none());
    }
}
