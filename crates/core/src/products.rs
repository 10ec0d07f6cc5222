//! The fixed coin package catalogue.

use serde::{Deserialize, Serialize};

/// A purchasable coin package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinProduct {
    pub id: &'static str,
    pub name: &'static str,
    pub base_coins: i64,
    pub bonus_coins: i64,
    pub total_coins: i64,
    /// Price in KRW.
    pub price: i64,
    /// Effective discount, in percent.
    pub discount_rate: u8,
}

/// Currency every package is priced in.
pub const PRODUCT_CURRENCY: &str = "KRW";

pub const COIN_PRODUCTS: [CoinProduct; 6] = [
    CoinProduct {
        id: "COIN_PACK_A",
        name: "코인 패키지 A",
        base_coins: 10,
        bonus_coins: 1,
        total_coins: 11,
        price: 1000,
        discount_rate: 10,
    },
    CoinProduct {
        id: "COIN_PACK_B",
        name: "코인 패키지 B",
        base_coins: 20,
        bonus_coins: 3,
        total_coins: 23,
        price: 2000,
        discount_rate: 15,
    },
    CoinProduct {
        id: "COIN_PACK_C",
        name: "코인 패키지 C",
        base_coins: 30,
        bonus_coins: 5,
        total_coins: 35,
        price: 3000,
        discount_rate: 17,
    },
    CoinProduct {
        id: "COIN_PACK_D",
        name: "코인 패키지 D",
        base_coins: 50,
        bonus_coins: 10,
        total_coins: 60,
        price: 5000,
        discount_rate: 20,
    },
    CoinProduct {
        id: "COIN_PACK_E",
        name: "코인 패키지 E",
        base_coins: 80,
        bonus_coins: 20,
        total_coins: 100,
        price: 8000,
        discount_rate: 25,
    },
    CoinProduct {
        id: "COIN_PACK_F",
        name: "코인 패키지 F",
        base_coins: 100,
        bonus_coins: 30,
        total_coins: 130,
        price: 10000,
        discount_rate: 30,
    },
];

pub fn find_product(id: &str) -> Option<&'static CoinProduct> {
    COIN_PRODUCTS.iter().find(|p| p.id == id)
}

/// The opaque reference the client attaches to a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReference {
    pub product_id: String,
}

impl ProductReference {
    /// Decode the reference and resolve it to a known product.
    pub fn resolve(raw: &str) -> Option<&'static CoinProduct> {
        let reference: ProductReference = serde_json::from_str(raw).ok()?;
        find_product(&reference.product_id)
    }

    pub fn encode(product_id: &str) -> String {
        serde_json::json!({ "productId": product_id }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_base_plus_bonus() {
        for p in &COIN_PRODUCTS {
            assert_eq!(p.total_coins, p.base_coins + p.bonus_coins, "{}", p.id);
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(find_product("COIN_PACK_D").map(|p| p.total_coins), Some(60));
        assert!(find_product("COIN_PACK_Z").is_none());
    }

    #[test]
    fn reference_resolves_from_json() {
        let raw = ProductReference::encode("COIN_PACK_B");
        assert_eq!(ProductReference::resolve(&raw).map(|p| p.price), Some(2000));
        assert!(ProductReference::resolve("not json").is_none());
        assert!(ProductReference::resolve(r#"{"productId":"NOPE"}"#).is_none());
        assert!(ProductReference::resolve(r#"{"other":"COIN_PACK_A"}"#).is_none());
    }
}
