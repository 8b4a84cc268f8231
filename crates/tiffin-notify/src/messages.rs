// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-order reminder texts.

use rand::seq::SliceRandom;

pub const REORDER_MESSAGES: [&str; 10] = [
    "Feeling hungry again? New flavors await on our menu! Order now!",
    "Missing our delicious dishes? Order your next meal now!",
    "It's been a while! It's the perfect time to re-order. Your favorite dishes are ready!",
    "Special offer! Get a discount on your next order this week. Check out the menu!",
    "It's been a day since your last order from us. Re-order your favorites!",
    "Hungry? Order your favorite meal from Delicious Bites now!",
    "Want to see what's new on our menu? Order now and try it out!",
    "Have you forgotten our taste? It's the perfect time to re-order!",
    "Thinking of ordering? This is the right hint! Order now!",
    "Your last order was great, right? Get that experience again!",
];

/// Appends the menu link to a reminder line.
pub fn compose(line: &str, menu_url: &str) -> String {
    format!("{line}\n\nVisit our web menu to order: {menu_url}")
}

/// A reminder built from a uniformly chosen line.
pub fn random_message(menu_url: &str) -> String {
    let line = REORDER_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(REORDER_MESSAGES[0]);
    compose(line, menu_url)
}
