//! The four cyclical product overlay templates.

use image::Rgb;
use reel_models::ProductMetadata;

/// Two-line text layout assigned to frame `i` as `ALL[i % 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayTemplate {
    BrandName,
    PriceDiscount,
    QualityBadge,
    CallToAction,
}

impl OverlayTemplate {
    pub const ALL: [OverlayTemplate; 4] = [
        OverlayTemplate::BrandName,
        OverlayTemplate::PriceDiscount,
        OverlayTemplate::QualityBadge,
        OverlayTemplate::CallToAction,
    ];

    /// Template for the frame at `index`.
    pub fn for_frame(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Position in the cycle.
    pub fn index(&self) -> usize {
        match self {
            OverlayTemplate::BrandName => 0,
            OverlayTemplate::PriceDiscount => 1,
            OverlayTemplate::QualityBadge => 2,
            OverlayTemplate::CallToAction => 3,
        }
    }

    /// Headline and subline text.
    pub fn lines(&self, product: &ProductMetadata, currency_symbol: &str) -> (String, String) {
        match self {
            OverlayTemplate::BrandName => (
                product.brand.trim().to_uppercase(),
                product.product_name.trim().to_string(),
            ),
            OverlayTemplate::PriceDiscount => {
                let discount = product
                    .discount
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .unwrap_or("LIMITED TIME OFFER");
                (product.price.display(currency_symbol), discount.to_string())
            }
            OverlayTemplate::QualityBadge => (
                "PREMIUM QUALITY".to_string(),
                "Trusted by thousands".to_string(),
            ),
            OverlayTemplate::CallToAction => ("SHOP NOW".to_string(), "Link in bio".to_string()),
        }
    }

    /// Headline color; the subline is always white.
    pub fn accent(&self) -> Rgb<u8> {
        match self {
            OverlayTemplate::BrandName => Rgb([255, 215, 0]),
            OverlayTemplate::PriceDiscount => Rgb([255, 82, 82]),
            OverlayTemplate::QualityBadge => Rgb([64, 196, 255]),
            OverlayTemplate::CallToAction => Rgb([105, 240, 174]),
        }
    }
}
