//! Human-readable one-liners for server console output.

use owo_colors::OwoColorize;
use tonk_shared::{Card, DrawSource, GameStatePublic, LastAction, RoundEndReason, Suit};

fn format_card(card: Card, color: bool) -> String {
    let text = card.label();
    if color && matches!(card.suit, Suit::Hearts | Suit::Diamonds) {
        text.red().to_string()
    } else {
        text
    }
}

fn format_cards(cards: &[Card], color: bool) -> String {
    cards
        .iter()
        .map(|&c| format_card(c, color))
        .collect::<Vec<_>>()
        .join(" ")
}

fn reason_str(reason: RoundEndReason) -> &'static str {
    match reason {
        RoundEndReason::Regular => "regular win",
        RoundEndReason::Reem => "REEM",
        RoundEndReason::AutoTriple => "automatic triple",
        RoundEndReason::CaughtDrop => "caught drop",
        RoundEndReason::DeckEmpty => "deck exhausted",
    }
}

/// One line per state transition, for the server console.
pub fn format_last_action(action: &LastAction, color: bool) -> String {
    match action {
        LastAction::Draw {
            user_id, source, ..
        } => {
            let from = match source {
                DrawSource::Deck => "the deck",
                DrawSource::Discard => "the discard pile",
            };
            format!("{user_id} drew from {from}")
        }
        LastAction::Discard { user_id, card, .. } => {
            format!("{user_id} discarded {}", format_card(*card, color))
        }
        LastAction::Spread {
            user_id, cards, ..
        } => format!("{user_id} spread {}", format_cards(cards, color)),
        LastAction::Hit {
            user_id,
            card,
            target_player_id,
            target_spread_index,
            ..
        } => format!(
            "{user_id} hit {}'s spread #{} with {}",
            target_player_id,
            target_spread_index,
            format_card(*card, color)
        ),
        LastAction::Drop { user_id, .. } => format!("{user_id} dropped"),
        LastAction::RoundEnd {
            reason, winner_id, ..
        } => {
            let line = format!("round over: {} for {winner_id}", reason_str(*reason));
            if color {
                line.bold().green().to_string()
            } else {
                line
            }
        }
    }
}

/// Table banner printed when a round starts.
pub fn format_table_header(gs: &GameStatePublic, color: bool) -> String {
    let seats = gs
        .players
        .iter()
        .map(|p| {
            if p.is_ai {
                format!("{} (bot)", p.username)
            } else {
                p.username.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let line = format!(
        "table {} | stake {} | pot {} | dealer seat {} | {}",
        gs.table_id, gs.base_stake, gs.pot, gs.current_dealer_index, seats
    );
    if color {
        line.bold().cyan().to_string()
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonk_shared::Rank;

    #[test]
    fn actions_render_without_color_codes() {
        let action = LastAction::Discard {
            user_id: "alice".to_owned(),
            card: Card::new(Suit::Spades, Rank::Jack),
            at: 0,
        };
        assert_eq!(format_last_action(&action, false), "alice discarded J♠");
    }

    #[test]
    fn round_end_names_the_reason() {
        let action = LastAction::RoundEnd {
            reason: RoundEndReason::Reem,
            winner_id: "bob".to_owned(),
            at: 0,
        };
        assert!(format_last_action(&action, false).contains("REEM"));
    }
}
