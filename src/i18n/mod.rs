//! Reply catalog keyed by the user's stored language preference.
//!
//! Burmese (`my`) is the primary language, English the fallback. Selection is
//! a plain lookup on the stored preference; there is no language detection.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phrase {
    Welcome,
    ConnectingToAgent,
    AgentsBusy,
    Fallback,
    NoMenuDefault,
    TimeoutNotice,
    TicketResolved,
}

pub fn phrase(key: Phrase, lang: &str) -> &'static str {
    match (key, lang) {
        (Phrase::Welcome, "my") => {
            "မြန်မာလင်း၀က်ဘ်ဆိုက်မှ ကြိုဆိုပါသည်။ အောက်ပါ menu မှ ရွေးချယ်ပါ။"
        }
        (Phrase::Welcome, _) => "Welcome to Myanmar Link. Please choose from the menu below.",
        (Phrase::ConnectingToAgent, "my") => "ဝန်ထမ်းနှင့်ချိတ်ဆက်နေပါသည်...",
        (Phrase::ConnectingToAgent, _) => "Connecting you to an agent...",
        (Phrase::AgentsBusy, "my") => {
            "ဝန်ထမ်းများ အလုပ်များနေပါသည်။ ကျေးဇူးပြု၍ စောင့်ဆိုင်းပေးပါ။"
        }
        (Phrase::AgentsBusy, _) => {
            "All of our agents are busy right now. You are in the queue and will be contacted shortly."
        }
        (Phrase::Fallback, "my") => {
            "ကျေးဇူးပြု၍ menu မှရွေးချယ်ပါ သို့မဟုတ် 'help' ဟုရိုက်ပါ။ ဝန်ထမ်းနှင့်စကားပြောလိုပါက 'agent' ဟုရိုက်ပါ။"
        }
        (Phrase::Fallback, _) => {
            "Sorry, I did not understand that. Please choose from the menu, type 'help', or type 'agent' to talk to a person."
        }
        (Phrase::NoMenuDefault, "my") => {
            "ဝန်ဆောင်မှုကို ခဏပြင်ဆင်နေပါသည်။ ကျေးဇူးပြု၍ နောက်မှပြန်လည်ဆက်သွယ်ပါ။"
        }
        (Phrase::NoMenuDefault, _) => {
            "Our service menu is being updated. Please try again in a moment, or type 'agent' to reach a person."
        }
        (Phrase::TimeoutNotice, "my") => {
            "ဝန်ထမ်းတုံ့ပြန်မှု ကြန့်ကြာနေသဖြင့် သင့်တောင်းဆိုမှုကို တန်းစီထဲသို့ ပြန်ထည့်ထားပါသည်။"
        }
        (Phrase::TimeoutNotice, _) => {
            "Your request has been returned to the support queue; the next available agent will assist you."
        }
        (Phrase::TicketResolved, "my") => {
            "သင့်တောင်းဆိုမှုကို ဖြေရှင်းပြီးပါပြီ။ ကျေးဇူးတင်ပါသည်။"
        }
        (Phrase::TicketResolved, _) => "Your support request has been resolved. Thank you.",
    }
}

pub fn queue_position_reply(lang: &str, position: usize) -> String {
    match lang {
        "my" => format!(
            "သင်သည် တန်းစီထဲတွင် အမှတ်စဉ် {} ဖြစ်ပါသည်။ ခဏစောင့်ပေးပါ။",
            position
        ),
        _ => format!("You are number {} in the support queue.", position),
    }
}

/// Canned keyword replies served without a menu match.
pub fn canned_reply(text: &str, lang: &str) -> Option<&'static str> {
    let normalized = text.trim().to_lowercase();
    let key = match normalized.as_str() {
        "hello" | "hi" | "မင်္ဂလာပါ" => "hello",
        "help" | "အကူအညီ" => "help",
        "services" | "service" | "ဝန်ဆောင်မှု" => "services",
        "contact" | "ဆက်သွယ်ရန်" => "contact",
        "about" => "about",
        _ => return None,
    };
    Some(match (key, lang) {
        ("hello", "my") => "မင်္ဂလာပါ! Myanmar Link မှ ကြိုဆိုပါသည်။ ဘာများကူညီပေးရမလဲ?",
        ("hello", _) => "Hello! Welcome to Myanmar Link. How can we help you?",
        ("help", "my") => {
            "ကူညီပေးနိုင်သည့်အရာများ:\n- ဝန်ဆောင်မှုအချက်အလက်များ\n- ဆက်သွယ်ရန်လိပ်စာ\n- ဝန်ထမ်းနှင့်စကားပြော ('agent')"
        }
        ("help", _) => {
            "I can help with:\n- Service information\n- Contact details\n- Talking to an agent (type 'agent')"
        }
        ("services", "my") => {
            "Myanmar Link ဝန်ဆောင်မှုများ:\n- အင်တာနက် ဝန်ဆောင်မှု\n- ဖုန်း ဝန်ဆောင်မှု\n- နည်းပညာ အကူအညီ"
        }
        ("services", _) => {
            "Myanmar Link services:\n- Internet service\n- Phone service\n- Technical support"
        }
        ("contact", "my") => {
            "ဆက်သွယ်ရန်:\nဖုန်း: +95-1-123-4567\nအီးမေးလ်: support@myanmarlink.com"
        }
        ("contact", _) => "Contact us:\nPhone: +95-1-123-4567\nEmail: support@myanmarlink.com",
        ("about", "my") => {
            "Myanmar Link သည် မြန်မာနိုင်ငံတွင် ဆက်သွယ်ရေးဝန်ဆောင်မှုများပေးသည့် ကုမ္ပဏီဖြစ်ပါသည်။"
        }
        ("about", _) => "Myanmar Link is a telecommunications service provider in Myanmar.",
        _ => unreachable!(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burmese_first_english_fallback() {
        assert!(phrase(Phrase::Welcome, "my").contains("ကြိုဆိုပါသည်"));
        assert!(phrase(Phrase::Welcome, "en").starts_with("Welcome"));
        // Unknown preferences fall through to English.
        assert_eq!(phrase(Phrase::Welcome, "th"), phrase(Phrase::Welcome, "en"));
    }

    #[test]
    fn canned_reply_matches_keywords_case_insensitively() {
        assert!(canned_reply("HELLO", "en").unwrap().starts_with("Hello"));
        assert!(canned_reply("  help ", "my").unwrap().contains("agent"));
        assert!(canned_reply("unrelated text", "en").is_none());
    }

    #[test]
    fn queue_position_is_interpolated() {
        assert!(queue_position_reply("en", 3).contains("number 3"));
        assert!(queue_position_reply("my", 2).contains('2'));
    }
}
