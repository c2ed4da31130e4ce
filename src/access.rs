//! Travel mode access bits shared by nodes, edges and access restrictions

pub const AUTO: u16 = 1;
pub const PEDESTRIAN: u16 = 2;
pub const BICYCLE: u16 = 4;
pub const TRUCK: u16 = 8;
pub const EMERGENCY: u16 = 16;
pub const TAXI: u16 = 32;
pub const BUS: u16 = 64;
pub const HOV: u16 = 128;
pub const WHEELCHAIR: u16 = 256;
pub const MOPED: u16 = 512;
pub const MOTORCYCLE: u16 = 1024;
pub const GOLF_CART: u16 = 2048;

/// Every mode; the widest value an access field may hold
pub const ALL: u16 = 4095;

pub const VEHICULAR: u16 = AUTO | TRUCK | MOPED | MOTORCYCLE | TAXI | BUS | HOV | GOLF_CART;

/// Modes reported by diagnostic exports, in export order
pub const NAMED_MODES: [(&str, u16); 9] = [
    ("bicycle", BICYCLE),
    ("bus", BUS),
    ("car", AUTO),
    ("emergency", EMERGENCY),
    ("HOV", HOV),
    ("pedestrian", PEDESTRIAN),
    ("taxi", TAXI),
    ("truck", TRUCK),
    ("wheelchair", WHEELCHAIR),
];

/// Access mask as an object of named booleans
pub fn to_json(mask: u16) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = NAMED_MODES
        .iter()
        .map(|(name, bit)| (name.to_string(), serde_json::Value::Bool(mask & bit != 0)))
        .collect();
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_covers_every_mode() {
        let union = AUTO
            | PEDESTRIAN
            | BICYCLE
            | TRUCK
            | EMERGENCY
            | TAXI
            | BUS
            | HOV
            | WHEELCHAIR
            | MOPED
            | MOTORCYCLE
            | GOLF_CART;
        assert_eq!(union, ALL);
    }

    #[test]
    fn test_to_json() {
        let json = to_json(AUTO | PEDESTRIAN);
        assert_eq!(json["car"], true);
        assert_eq!(json["pedestrian"], true);
        assert_eq!(json["truck"], false);
        assert_eq!(json.as_object().unwrap().len(), 9);
    }
}
