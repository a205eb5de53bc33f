use serde::{Deserialize, Serialize};

use crate::store::{NewProduct, Product, User};

use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub products: i64,
}

/// User view with the credential field stripped. Every user-bearing response
/// goes through this type.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthRequest {
    /// Both fields are required and must be non-blank.
    pub fn credentials(&self) -> Result<(&str, &str), ApiError> {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| invalid("username", "is required"))?;
        let password = self
            .password
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| invalid("password", "is required"))?;
        Ok((username, password))
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price_cost: f64,
    pub price_sale: f64,
    pub quantity: i64,
    pub image: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price_cost: product.price_cost,
            price_sale: product.price_sale,
            quantity: product.quantity,
            image: product.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub id: i64,
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
pub struct UpdatedResponse {
    pub message: &'static str,
    pub product: ProductResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// A JSON number or a numeric string; both coerce. Anything else fails
/// validation before the store is touched.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(value) => *value,
            Numeric::Text(raw) => raw.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cost: Option<Numeric>,
    pub price_sale: Option<Numeric>,
    pub quantity: Option<Numeric>,
    pub image: Option<String>,
}

impl ProductPayload {
    /// Boundary validation: name and description must be present and
    /// non-blank, the three numeric fields must coerce to finite numbers.
    /// The image defaults to an empty string when omitted.
    pub fn validate(self) -> Result<NewProduct, ApiError> {
        let name = required_text(self.name, "name")?;
        let description = required_text(self.description, "description")?;
        let price_cost = required_number(self.price_cost.as_ref(), "price_cost")?;
        let price_sale = required_number(self.price_sale.as_ref(), "price_sale")?;
        let quantity = required_number(self.quantity.as_ref(), "quantity")? as i64;

        Ok(NewProduct {
            name,
            description,
            price_cost,
            price_sale,
            quantity,
            image: self.image.unwrap_or_default(),
        })
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
        .ok_or_else(|| invalid(field, "is required"))
}

fn required_number(value: Option<&Numeric>, field: &str) -> Result<f64, ApiError> {
    value
        .and_then(Numeric::as_f64)
        .ok_or_else(|| invalid(field, "must be a number"))
}

fn invalid(field: &str, reason: &str) -> ApiError {
    ApiError::Validation {
        details: format!("{field} {reason}"),
    }
}
