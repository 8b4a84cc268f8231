// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword-based reply router.

use async_trait::async_trait;
use tiffin_config::model::ShopConfig;
use tiffin_core::{InboundMessage, MessageRouter, RouterAction, RouterReply, TiffinError};

const DEFAULT_LOCATION_ADDRESS: &str = "Location shared via WhatsApp";
const LOCATION_ACK: &str = "Your location has been updated. Thank you!";
const LOCATION_UNAVAILABLE: &str =
    "Sorry, shop location is currently unavailable. Please contact the admin.";

/// Shop details quoted in replies.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopProfile {
    pub name: String,
    pub menu_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ShopProfile {
    pub fn from_config(config: &ShopConfig) -> Self {
        Self {
            name: config.name.clone(),
            menu_url: config.menu_url.clone(),
            latitude: config.latitude,
            longitude: config.longitude,
        }
    }

    fn maps_link(&self) -> Option<String> {
        let (lat, lng) = self.latitude.zip(self.longitude)?;
        Some(format!(
            "https://www.google.com/maps/search/?api=1&query={lat},{lng}"
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Welcome,
    ViewMenu,
    ShopLocation,
    OnlinePayment,
    Help,
}

const KEYWORDS: &[(&str, Intent)] = &[
    ("hi", Intent::Welcome),
    ("hello", Intent::Welcome),
    ("hey", Intent::Welcome),
    ("namaste", Intent::Welcome),
    ("menu", Intent::Welcome),
    ("1", Intent::ViewMenu),
    ("view menu", Intent::ViewMenu),
    ("2", Intent::ShopLocation),
    ("shop location", Intent::ShopLocation),
    ("op", Intent::OnlinePayment),
    ("online payment", Intent::OnlinePayment),
    ("5", Intent::Help),
    ("help", Intent::Help),
];

/// Answers the fixed keyword set and records shared locations.
#[derive(Debug, Clone)]
pub struct KeywordRouter {
    shop: ShopProfile,
}

impl KeywordRouter {
    pub fn new(shop: ShopProfile) -> Self {
        Self { shop }
    }

    fn welcome(&self, name: Option<&str>) -> String {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("foodie");
        format!(
            "Hello {name}! Welcome to *{shop}*!\n\n\
             Ready to order? Visit our web menu here:\n{url}\n\n\
             Or choose an option below:\n\n\
             1. View our menu\n\
             2. Get our shop location\n\
             5. Help\n\n\
             Simply reply with the *number* or *keyword* for your choice!",
            shop = self.shop.name,
            url = self.shop.menu_url,
        )
    }

    fn view_menu(&self) -> String {
        format!(
            "Our full menu with prices and photos is here:\n{}\n\nPlace your order right from that page.",
            self.shop.menu_url
        )
    }

    fn help(&self) -> String {
        format!(
            "*{shop} help*\n\n\
             - Type *Hi* for the main menu\n\
             - Type *1* or *View menu* to see what we serve\n\
             - Type *2* or *Shop location* for directions\n\
             - Type *OP* for online payment info\n\
             - Share your location to update your delivery address\n\n\
             To order, visit our web menu: {url}",
            shop = self.shop.name,
            url = self.shop.menu_url,
        )
    }

    fn shop_location(&self) -> String {
        match self.shop.maps_link() {
            Some(link) => format!("Here is our shop location:\n{link}"),
            None => LOCATION_UNAVAILABLE.to_string(),
        }
    }

    fn online_payment(&self) -> String {
        format!(
            "Online payment will be added soon! For now, please use Cash on Delivery or place your order through our web menu: {}",
            self.shop.menu_url
        )
    }

    fn fallback(&self) -> String {
        format!(
            "I did not understand your request. To place an order, please visit our web menu: {}. \
             You can also type \"Hi\" to return to the main menu or ask for \"Help\".",
            self.shop.menu_url
        )
    }
}

fn normalize(body: &str) -> String {
    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[async_trait]
impl MessageRouter for KeywordRouter {
    async fn route(&self, message: &InboundMessage) -> Result<RouterReply, TiffinError> {
        if let Some(location) = &message.location {
            let mut location = location.clone();
            if location
                .address
                .as_deref()
                .is_none_or(|a| a.trim().is_empty())
            {
                location.address = Some(DEFAULT_LOCATION_ADDRESS.to_string());
            }
            return Ok(RouterReply::text(LOCATION_ACK)
                .with_action(RouterAction::UpdateCustomerLocation(location)));
        }

        let keyword = normalize(&message.body);
        let intent = KEYWORDS
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, intent)| *intent);

        let text = match intent {
            Some(Intent::Welcome) => self.welcome(message.notify_name.as_deref()),
            Some(Intent::ViewMenu) => self.view_menu(),
            Some(Intent::ShopLocation) => self.shop_location(),
            Some(Intent::OnlinePayment) => self.online_payment(),
            Some(Intent::Help) => self.help(),
            None => self.fallback(),
        };
        Ok(RouterReply::text(text))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tiffin_core::Location;

    use super::*;

    fn router() -> KeywordRouter {
        KeywordRouter::new(ShopProfile {
            name: "Delicious Bites".into(),
            menu_url: "https://bites.example/menu".into(),
            latitude: Some(17.4399),
            longitude: Some(78.4983),
        })
    }

    fn message(body: &str) -> InboundMessage {
        InboundMessage {
            sender_id: "919876543210@c.us".into(),
            body: body.into(),
            notify_name: None,
            location: None,
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn greeting_uses_notify_name() {
        let mut msg = message("  Hello ");
        msg.notify_name = Some("Asha".into());
        let reply = router().route(&msg).await.unwrap();
        let text = reply.text.unwrap();
        assert!(text.starts_with("Hello Asha!"));
        assert!(text.contains("https://bites.example/menu"));

        let anon = router().route(&message("hi")).await.unwrap();
        assert!(anon.text.unwrap().starts_with("Hello foodie!"));
    }

    #[tokio::test]
    async fn shop_location_link() {
        let reply = router().route(&message("Shop   Location")).await.unwrap();
        assert!(reply.text.unwrap().contains(
            "https://www.google.com/maps/search/?api=1&query=17.4399,78.4983"
        ));

        let mut shop = router().shop;
        shop.latitude = None;
        let reply = KeywordRouter::new(shop)
            .route(&message("2"))
            .await
            .unwrap();
        assert_eq!(reply.text.as_deref(), Some(LOCATION_UNAVAILABLE));
    }

    #[tokio::test]
    async fn online_payment_and_fallback() {
        let reply = router().route(&message("OP")).await.unwrap();
        assert!(reply.text.unwrap().starts_with("Online payment will be added soon!"));

        let reply = router().route(&message("biryani please")).await.unwrap();
        let text = reply.text.unwrap();
        assert!(text.starts_with("I did not understand your request."));
        assert!(reply.actions.is_empty());
    }

    #[tokio::test]
    async fn location_attachment_requests_update() {
        let mut msg = message("");
        msg.location = Some(Location {
            latitude: 17.0,
            longitude: 78.0,
            address: None,
        });
        let reply = router().route(&msg).await.unwrap();
        assert_eq!(reply.text.as_deref(), Some(LOCATION_ACK));
        assert_eq!(
            reply.actions,
            vec![RouterAction::UpdateCustomerLocation(Location {
                latitude: 17.0,
                longitude: 78.0,
                address: Some(DEFAULT_LOCATION_ADDRESS.into()),
            })]
        );
    }
}
