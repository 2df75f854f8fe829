//! Validation utilities for the Workshop Inventory Management Platform

use rust_decimal::Decimal;

// ============================================================================
// Quantity and Price Validations
// ============================================================================

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate that a unit price is not negative
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate a production quantity (whole units)
pub fn validate_production_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Production quantity must be at least 1");
    }
    Ok(())
}

/// Validate a markup percentage (0-1000)
pub fn validate_markup_percent(markup: Decimal) -> Result<(), &'static str> {
    if markup < Decimal::ZERO || markup > Decimal::from(1000) {
        return Err("Markup percent must be between 0 and 1000");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate an entity name (non-empty, bounded length)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.len() > 255 {
        return Err("Name is too long (max 255 characters)");
    }
    Ok(())
}

/// Validate a unit of measure string
pub fn validate_unit(unit: &str) -> Result<(), &'static str> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return Err("Unit of measure cannot be empty");
    }
    if trimmed.len() > 32 {
        return Err("Unit of measure is too long (max 32 characters)");
    }
    Ok(())
}
