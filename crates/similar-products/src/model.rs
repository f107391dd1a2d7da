//! Domain model: product identifiers, validated product details and the raw
//! upstream payload they are built from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A product identifier: any string that is non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

/// The given product id was empty or only whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("product id must not be blank")]
pub struct InvalidProductId;

impl ProductId {
    /// Trims `raw` and rejects blank input.
    pub fn parse(raw: &str) -> Result<Self, InvalidProductId> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(InvalidProductId)
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductId {
    type Error = InvalidProductId;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl TryFrom<&str> for ProductId {
    type Error = InvalidProductId;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an upstream payload could not become a [`ProductDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidProduct {
    #[error("product has no id")]
    MissingId,
    #[error("product {id} has no name")]
    MissingName { id: String },
    #[error("product {id} has no price")]
    MissingPrice { id: String },
    #[error("product {id} has a negative price")]
    NegativePrice { id: String },
    #[error("product {id} has no availability")]
    MissingAvailability { id: String },
}

/// A fully validated product, as returned to callers.
///
/// The id and name are trimmed and non-empty, and the price is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    id: ProductId,
    name: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    price: Decimal,
    availability: bool,
}

impl ProductDetail {
    pub fn new(
        id: ProductId,
        name: &str,
        price: Decimal,
        availability: bool,
    ) -> Result<Self, InvalidProduct> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidProduct::MissingName {
                id: id.to_string(),
            });
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(InvalidProduct::NegativePrice {
                id: id.to_string(),
            });
        }
        Ok(Self {
            id,
            name: name.to_string(),
            price,
            availability,
        })
    }

    /// A product that is available for sale.
    pub fn of(id: ProductId, name: &str, price: Decimal) -> Result<Self, InvalidProduct> {
        Self::new(id, name, price, true)
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn availability(&self) -> bool {
        self.availability
    }
}

/// Product payload as the upstream service sends it.
///
/// Every field is optional so that incomplete payloads decode and are then
/// rejected by [`ProductResponse::into_detail`] instead of failing the call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub availability: Option<bool>,
}

impl ProductResponse {
    /// Validates the payload into a [`ProductDetail`].
    pub fn into_detail(self) -> Result<ProductDetail, InvalidProduct> {
        let id = self
            .id
            .as_deref()
            .and_then(|raw| ProductId::parse(raw).ok())
            .ok_or(InvalidProduct::MissingId)?;
        let name = self.name.ok_or_else(|| InvalidProduct::MissingName {
            id: id.to_string(),
        })?;
        let price = self.price.ok_or_else(|| InvalidProduct::MissingPrice {
            id: id.to_string(),
        })?;
        let availability = self
            .availability
            .ok_or_else(|| InvalidProduct::MissingAvailability {
                id: id.to_string(),
            })?;
        ProductDetail::new(id, &name, price, availability)
    }
}
