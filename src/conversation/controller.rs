//! The conversation state machine.
//!
//! Pure transition function: consumes the current session (if any) and one
//! incoming event, returns the next session, the prompts to emit, and the
//! lead to dispatch if the dialog just completed. All I/O happens in the
//! runner, which keeps every transition unit-testable.

use crate::catalog::Catalog;
use crate::channels::{Event, Incoming, MarkupHint, UserInfo};
use crate::lead::{Lead, escape_html};
use crate::phone;

use super::session::{Session, Stage};

/// Reply-keyboard label for the one-tap contact share.
pub const CONTACT_LABEL: &str = "📱 Отправить мой номер";

/// Reply-keyboard label that returns the user to category selection. The
/// controller recognizes it by exact text match while awaiting a phone.
pub const BACK_LABEL: &str = "🔙 Назад к выбору направления";

/// Display name when the transport supplies neither a name nor a username.
const FALLBACK_NAME: &str = "Пользователь";

/// A side effect the runner performs on the transport after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ShowCategories { text: String },
    ShowText { text: String, markup: MarkupHint },
    ShowPhonePrompt { text: String },
    ClearReplyControls { text: String },
}

/// Result of one transition.
#[derive(Debug)]
pub struct Outcome {
    /// Next session state; `None` clears the user's session.
    pub session: Option<Session>,
    pub effects: Vec<Effect>,
    /// Set exactly when the dialog reached completion.
    pub lead: Option<Lead>,
}

impl Outcome {
    fn keep(session: Session, effects: Vec<Effect>) -> Self {
        Self {
            session: Some(session),
            effects,
            lead: None,
        }
    }

    fn clear(effects: Vec<Effect>) -> Self {
        Self {
            session: None,
            effects,
            lead: None,
        }
    }
}

/// The state machine. Holds only the read-only catalog.
pub struct Controller {
    catalog: Catalog,
}

impl Controller {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Apply one event to the user's current session.
    pub fn handle(&self, session: Option<Session>, incoming: &Incoming) -> Outcome {
        match &incoming.event {
            // /start restarts from a clean session no matter what came
            // before; prior answers are discarded, never merged.
            Event::Start => self.restart(&incoming.user),
            event => match session {
                // No dialog in progress: everything except /start gets the
                // same hint, /cancel included.
                None => Outcome {
                    session: None,
                    effects: vec![Effect::ShowText {
                        text: "Пожалуйста, используйте /start для начала работы с ботом 🙂"
                            .to_string(),
                        markup: MarkupHint::Plain,
                    }],
                    lead: None,
                },
                Some(session) => match event {
                    Event::Cancel => Outcome::clear(vec![Effect::ClearReplyControls {
                        text: "❌ Диалог отменён. Напишите /start чтобы начать заново."
                            .to_string(),
                    }]),
                    _ => match session.stage {
                        Stage::AwaitingDirection => self.awaiting_direction(session, event),
                        Stage::AwaitingPhone => {
                            self.awaiting_phone(session, &incoming.user, event)
                        }
                    },
                },
            },
        }
    }

    fn restart(&self, user: &UserInfo) -> Outcome {
        let display_name = resolve_display_name(user);
        let greeting_name = user
            .first_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&display_name);
        let greeting = format!(
            "👋 Привет, <b>{}</b>!\n\n\
             Добро пожаловать в <b>Компьютерную Академию TOP</b> 🎓\n\n\
             Мы готовим востребованных IT-специалистов по современным программам.\n\n\
             Пожалуйста, выберите направление, которое вас интересует:",
            escape_html(greeting_name)
        );
        Outcome::keep(
            Session::new(user.id, display_name),
            vec![Effect::ShowCategories { text: greeting }],
        )
    }

    fn awaiting_direction(&self, mut session: Session, event: &Event) -> Outcome {
        match event {
            Event::CategorySelected { code } => {
                let Some(category) = self.catalog.get(code) else {
                    // Unknown code: ignored, no state change, no prompt.
                    tracing::debug!(user_id = session.user_id, %code, "unknown category code");
                    return Outcome::keep(session, vec![]);
                };
                session.direction = Some(category.code.clone());
                session.stage = Stage::AwaitingPhone;
                let confirmation = format!(
                    "✅ Вы выбрали: <b>{}</b>\n\n\
                     Отлично! Теперь, пожалуйста, поделитесь своим номером телефона, \
                     чтобы наш менеджер мог связаться с вами 📞",
                    escape_html(&category.label)
                );
                Outcome::keep(
                    session,
                    vec![
                        Effect::ShowText {
                            text: confirmation,
                            markup: MarkupHint::Html,
                        },
                        Effect::ShowPhonePrompt {
                            text: "Нажмите кнопку ниже или введите номер вручную в формате \
                                   <b>+7XXXXXXXXXX</b>:"
                                .to_string(),
                        },
                    ],
                )
            }
            // Anything else while picking a category: nudge toward the
            // buttons, leave state alone.
            _ => Outcome::keep(
                session,
                vec![Effect::ShowText {
                    text: "⬆️ Пожалуйста, выберите направление с помощью кнопок выше."
                        .to_string(),
                    markup: MarkupHint::Plain,
                }],
            ),
        }
    }

    fn awaiting_phone(&self, session: Session, user: &UserInfo, event: &Event) -> Outcome {
        match event {
            Event::Text { text } if text == BACK_LABEL => self.back_to_directions(session),
            Event::ContactShared { raw_number } => {
                // Contact payloads often come without the leading +.
                let raw = if raw_number.starts_with('+') {
                    raw_number.clone()
                } else {
                    format!("+{raw_number}")
                };
                match phone::normalize(&raw) {
                    Some(normalized) => self.complete(session, user, normalized),
                    None => Outcome::keep(
                        session,
                        vec![Effect::ShowText {
                            text: "⚠️ Полученный номер имеет неверный формат. \
                                   Пожалуйста, введите номер вручную."
                                .to_string(),
                            markup: MarkupHint::Plain,
                        }],
                    ),
                }
            }
            Event::Text { text } => match phone::normalize(text.trim()) {
                Some(normalized) => self.complete(session, user, normalized),
                None => self.reject_phone(session),
            },
            _ => self.reject_phone(session),
        }
    }

    fn back_to_directions(&self, mut session: Session) -> Outcome {
        session.direction = None;
        session.stage = Stage::AwaitingDirection;
        Outcome::keep(
            session,
            vec![
                Effect::ShowCategories {
                    text: "Пожалуйста, выберите направление:".to_string(),
                },
                Effect::ClearReplyControls {
                    text: "⬆️ Выберите направление выше.".to_string(),
                },
            ],
        )
    }

    /// Invalid phone: re-prompt with the expected format, stage unchanged.
    /// The reply keyboard stays up so the user can retry or share a contact.
    fn reject_phone(&self, session: Session) -> Outcome {
        Outcome::keep(
            session,
            vec![Effect::ShowText {
                text: "⚠️ Пожалуйста, введите корректный номер телефона в формате \
                       <b>+7XXXXXXXXXX</b>\n\
                       Или воспользуйтесь кнопкой «Отправить мой номер»."
                    .to_string(),
                markup: MarkupHint::Html,
            }],
        )
    }

    fn complete(&self, mut session: Session, user: &UserInfo, normalized: String) -> Outcome {
        session.phone = Some(normalized.clone());
        let Some(direction) = session.direction.clone() else {
            // AwaitingPhone guarantees a direction; getting here is a bug.
            tracing::error!(user_id = session.user_id, "phone stage without a direction");
            return self.back_to_directions(session);
        };
        let lead = Lead {
            user_id: session.user_id,
            display_name: session.display_name.clone(),
            username: user.username.clone(),
            direction,
            phone: normalized,
        };
        Outcome {
            session: None,
            effects: vec![Effect::ClearReplyControls {
                text: "✅ <b>Спасибо! Ваша заявка принята.</b>\n\n\
                       Наш менеджер свяжется с вами в ближайшее время 🚀\n\n\
                       Если у вас есть вопросы — напишите нам:\n\
                       📌 <a href=\"https://volgograd.top-academy.ru/\">Сайт Академии TOP</a>"
                    .to_string(),
            }],
            lead: Some(lead),
        }
    }
}

/// Display-name precedence: full name, then username, then a generic
/// fallback. Never empty.
fn resolve_display_name(user: &UserInfo) -> String {
    user.full_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(user.username.as_deref().filter(|n| !n.is_empty()))
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChatId;

    const CHAT: ChatId = 100;

    fn user() -> UserInfo {
        UserInfo {
            id: 42,
            first_name: Some("Иван".into()),
            full_name: Some("Иван Петров".into()),
            username: Some("ivan".into()),
        }
    }

    fn incoming(event: Event) -> Incoming {
        Incoming {
            chat: CHAT,
            user: user(),
            event,
        }
    }

    fn controller() -> Controller {
        Controller::new(Catalog::default())
    }

    fn started(controller: &Controller) -> Session {
        controller
            .handle(None, &incoming(Event::Start))
            .session
            .unwrap()
    }

    fn at_phone(controller: &Controller, code: &str) -> Session {
        let session = started(controller);
        controller
            .handle(
                Some(session),
                &incoming(Event::CategorySelected { code: code.into() }),
            )
            .session
            .unwrap()
    }

    #[test]
    fn start_creates_fresh_session_with_category_prompt() {
        let ctl = controller();
        let outcome = ctl.handle(None, &incoming(Event::Start));
        let session = outcome.session.unwrap();
        assert_eq!(session.stage, Stage::AwaitingDirection);
        assert_eq!(session.display_name, "Иван Петров");
        assert!(session.direction.is_none() && session.phone.is_none());
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ShowCategories { text }] if text.contains("Иван")
        ));
    }

    #[test]
    fn display_name_falls_back_to_username_then_generic() {
        let ctl = controller();
        let mut no_name = user();
        no_name.first_name = None;
        no_name.full_name = None;
        let outcome = ctl.handle(
            None,
            &Incoming {
                chat: CHAT,
                user: no_name.clone(),
                event: Event::Start,
            },
        );
        assert_eq!(outcome.session.unwrap().display_name, "ivan");

        no_name.username = None;
        let outcome = ctl.handle(
            None,
            &Incoming {
                chat: CHAT,
                user: no_name,
                event: Event::Start,
            },
        );
        assert_eq!(outcome.session.unwrap().display_name, "Пользователь");
    }

    #[test]
    fn every_catalog_code_advances_to_phone_stage() {
        let ctl = controller();
        for category in ctl.catalog().entries().to_vec() {
            let session = started(&ctl);
            let outcome = ctl.handle(
                Some(session),
                &incoming(Event::CategorySelected {
                    code: category.code.clone(),
                }),
            );
            let session = outcome.session.unwrap();
            assert_eq!(session.stage, Stage::AwaitingPhone);
            assert_eq!(session.direction.as_deref(), Some(category.code.as_str()));
            assert!(matches!(
                outcome.effects.as_slice(),
                [
                    Effect::ShowText { text, markup: MarkupHint::Html },
                    Effect::ShowPhonePrompt { .. },
                ] if text.contains(&category.label)
            ));
        }
    }

    #[test]
    fn unknown_code_is_ignored() {
        let ctl = controller();
        let session = started(&ctl);
        let outcome = ctl.handle(
            Some(session.clone()),
            &incoming(Event::CategorySelected {
                code: "Школа".into(),
            }),
        );
        assert_eq!(outcome.session.unwrap(), session);
        assert!(outcome.effects.is_empty());
        assert!(outcome.lead.is_none());
    }

    #[test]
    fn restart_is_idempotent_from_any_stage() {
        let ctl = controller();
        let session = at_phone(&ctl, "ВУЗ");
        let outcome = ctl.handle(Some(session), &incoming(Event::Start));
        let session = outcome.session.unwrap();
        assert_eq!(session.stage, Stage::AwaitingDirection);
        assert!(session.direction.is_none() && session.phone.is_none());

        // Twice in a row: same fresh result.
        let outcome = ctl.handle(Some(session), &incoming(Event::Start));
        let session = outcome.session.unwrap();
        assert_eq!(session.stage, Stage::AwaitingDirection);
        assert!(session.direction.is_none());
    }

    #[test]
    fn back_edge_clears_direction() {
        let ctl = controller();
        let session = at_phone(&ctl, "Колледж");
        let outcome = ctl.handle(
            Some(session),
            &incoming(Event::Text {
                text: BACK_LABEL.into(),
            }),
        );
        let session = outcome.session.unwrap();
        assert_eq!(session.stage, Stage::AwaitingDirection);
        assert!(session.direction.is_none());
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ShowCategories { .. }, Effect::ClearReplyControls { .. }]
        ));
    }

    #[test]
    fn valid_text_phone_completes_and_clears_session() {
        let ctl = controller();
        let session = at_phone(&ctl, "Колледж");
        let outcome = ctl.handle(
            Some(session),
            &incoming(Event::Text {
                text: "+79990001122".into(),
            }),
        );
        assert!(outcome.session.is_none());
        let lead = outcome.lead.unwrap();
        assert_eq!(lead.direction, "Колледж");
        assert_eq!(lead.phone, "+79990001122");
        assert_eq!(lead.user_id, 42);
        assert_eq!(lead.username.as_deref(), Some("ivan"));
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ClearReplyControls { text }] if text.contains("заявка принята")
        ));
    }

    #[test]
    fn invalid_text_phone_stays_in_phone_stage() {
        let ctl = controller();
        let session = at_phone(&ctl, "ВУЗ");
        let outcome = ctl.handle(
            Some(session),
            &incoming(Event::Text {
                text: "12345".into(),
            }),
        );
        let session = outcome.session.unwrap();
        assert_eq!(session.stage, Stage::AwaitingPhone);
        assert_eq!(session.direction.as_deref(), Some("ВУЗ"));
        assert!(outcome.lead.is_none());
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ShowText { text, .. }] if text.contains("+7XXXXXXXXXX")
        ));
    }

    #[test]
    fn contact_without_plus_is_normalized() {
        let ctl = controller();
        let session = at_phone(&ctl, "Академия");
        let outcome = ctl.handle(
            Some(session),
            &incoming(Event::ContactShared {
                raw_number: "79990001122".into(),
            }),
        );
        assert_eq!(outcome.lead.unwrap().phone, "+79990001122");
        assert!(outcome.session.is_none());
    }

    #[test]
    fn invalid_contact_asks_for_manual_entry() {
        let ctl = controller();
        let session = at_phone(&ctl, "Академия");
        let outcome = ctl.handle(
            Some(session),
            &incoming(Event::ContactShared {
                raw_number: "12345".into(),
            }),
        );
        assert_eq!(outcome.session.unwrap().stage, Stage::AwaitingPhone);
        assert!(outcome.lead.is_none());
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ShowText { text, .. }] if text.contains("введите номер вручную")
        ));
    }

    #[test]
    fn cancel_clears_session_from_any_stage() {
        let ctl = controller();
        let session = at_phone(&ctl, "ВУЗ");
        let outcome = ctl.handle(Some(session), &incoming(Event::Cancel));
        assert!(outcome.session.is_none());
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ClearReplyControls { text }] if text.contains("отменён")
        ));
    }

    #[test]
    fn events_without_session_produce_start_hint() {
        let ctl = controller();
        for event in [
            Event::Cancel,
            Event::Text { text: "привет".into() },
            Event::CategorySelected { code: "ВУЗ".into() },
            Event::ContactShared { raw_number: "79990001122".into() },
            Event::Other,
        ] {
            let outcome = ctl.handle(None, &incoming(event));
            assert!(outcome.session.is_none());
            assert!(outcome.lead.is_none());
            assert!(matches!(
                outcome.effects.as_slice(),
                [Effect::ShowText { text, .. }] if text.contains("/start")
            ));
        }
    }

    #[test]
    fn text_while_awaiting_direction_nudges_to_buttons() {
        let ctl = controller();
        let session = started(&ctl);
        let outcome = ctl.handle(
            Some(session.clone()),
            &incoming(Event::Text {
                text: "хочу на курс".into(),
            }),
        );
        assert_eq!(outcome.session.unwrap(), session);
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::ShowText { text, .. }] if text.contains("направление")
        ));
    }
}
