//! Admiral, matched by localized button labels.

use std::sync::LazyLock;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::{DEFAULT_WAIT_TIMEOUT, VisibilityCheck};

const PILLS: &str = "div > div[class*=Card] > div[class*=Frame] > div[class*=Pills] > button[class*=Pills__StyledPill]";

const REJECT_ALL_LABELS: &[&str] = &[
    "Afvis alle",
    "Reject all",
    "Odbaci sve",
    "Rechazar todo",
    "Atmesti visus",
    "Odmítnout vše",
    "Απόρριψη όλων",
    "Rejeitar tudo",
    "Tümünü reddet",
    "Отклонить все",
    "Noraidīt visu",
    "Avvisa alla",
    "Odrzuć wszystkie",
    "Alles afwijzen",
    "Отхвърляне на всички",
    "Rifiuta tutto",
    "Zavrni vse",
    "Az összes elutasítása",
    "Respingeți tot",
    "Alles ablehnen",
    "Tout rejeter",
    "Odmietnuť všetko",
    "Lükka kõik tagasi",
    "Hylkää kaikki",
];

const PURPOSES_LABELS: &[&str] = &[
    "Zwecke",
    "Σκοποί",
    "Purposes",
    "Цели",
    "Eesmärgid",
    "Tikslai",
    "Svrhe",
    "Cele",
    "Účely",
    "Finalidades",
    "Mērķi",
    "Scopuri",
    "Fines",
    "Ändamål",
    "Finalités",
    "Doeleinden",
    "Tarkoitukset",
    "Scopi",
    "Amaçlar",
    "Nameni",
    "Célok",
    "Formål",
];

const SAVE_AND_EXIT_LABELS: &[&str] = &[
    "Spara & avsluta",
    "Save & exit",
    "Uložit a ukončit",
    "Enregistrer et quitter",
    "Speichern & Verlassen",
    "Tallenna ja poistu",
    "Išsaugoti ir išeiti",
    "Opslaan & afsluiten",
    "Guardar y salir",
    "Shrani in zapri",
    "Uložiť a ukončiť",
    "Kaydet ve çıkış yap",
    "Сохранить и выйти",
    "Salvesta ja välju",
    "Salva ed esci",
    "Gem & afslut",
    "Αποθήκευση και έξοδος",
    "Saglabāt un iziet",
    "Mentés és kilépés",
    "Guardar e sair",
    "Zapisz & zakończ",
    "Salvare și ieșire",
    "Spremi i izađi",
    "Запазване и изход",
];

const ACCEPT_ALL_LABELS: &[&str] = &[
    "Sprejmi vse",
    "Prihvati sve",
    "Godkänn alla",
    "Prijať všetko",
    "Принять все",
    "Aceptar todo",
    "Αποδοχή όλων",
    "Zaakceptuj wszystkie",
    "Accetta tutto",
    "Priimti visus",
    "Pieņemt visu",
    "Tümünü kabul et",
    "Az összes elfogadása",
    "Accept all",
    "Приемане на всички",
    "Accepter alle",
    "Hyväksy kaikki",
    "Tout accepter",
    "Alles accepteren",
    "Aktsepteeri kõik",
    "Přijmout vše",
    "Alles akzeptieren",
    "Aceitar tudo",
    "Acceptați tot",
];

/// `xpath///button[contains(., 'a') or contains(., 'b') ...]`
fn button_labelled(labels: &[&str]) -> String {
    let predicates: Vec<String> = labels.iter().map(|l| format!("contains(., '{l}')")).collect();
    format!("xpath///button[{}]", predicates.join(" or "))
}

static REJECT_ALL: LazyLock<String> = LazyLock::new(|| button_labelled(REJECT_ALL_LABELS));
static PURPOSES: LazyLock<String> = LazyLock::new(|| button_labelled(PURPOSES_LABELS));
static SAVE_AND_EXIT: LazyLock<String> = LazyLock::new(|| button_labelled(SAVE_AND_EXIT_LABELS));
static ACCEPT_ALL: LazyLock<String> = LazyLock::new(|| button_labelled(ACCEPT_ALL_LABELS));

/// Admiral card with purpose pills.
#[derive(Debug, Default)]
pub struct Admiral;

impl Admiral {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Admiral {
    fn name(&self) -> &str {
        "Admiral"
    }

    fn has_self_test(&self) -> bool {
        false
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists(PILLS)
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(PILLS, VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if cx.wait_for_element(&REJECT_ALL, std::time::Duration::from_millis(500)).await {
            return cx.click(&REJECT_ALL);
        }
        if !cx.wait_for_then_click(&PURPOSES, DEFAULT_WAIT_TIMEOUT).await {
            return false;
        }
        if !cx
            .wait_for_visible(&SAVE_AND_EXIT, DEFAULT_WAIT_TIMEOUT, VisibilityCheck::Any)
            .await
        {
            return false;
        }

        let env = cx.env();
        let popup_body = cx
            .dom()
            .element_selector(&SAVE_AND_EXIT.as_str().into())
            .first()
            .and_then(|save| env.parent_element(*save))
            .and_then(|parent| env.parent_element(parent));
        if let Some(body) = popup_body {
            for checkbox in cx.query_all_in(Some(body), "input[type=checkbox]:checked") {
                env.click(checkbox);
            }
        }
        cx.click(&SAVE_AND_EXIT)
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.click(&ACCEPT_ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    fn card(dom: &MemoryDom) -> crate::identifiers::NodeId {
        let outer = dom.append(None, ElementSpec::new("div"));
        let card = dom.append(Some(outer), ElementSpec::new("div").class("sc-Card-x"));
        let frame = dom.append(Some(card), ElementSpec::new("div").class("sc-Frame-y"));
        let pills = dom.append(Some(frame), ElementSpec::new("div").class("sc-Pills-z"));
        dom.append(Some(pills), ElementSpec::new("button").class("Pills__StyledPill-a"));
        card
    }

    #[test]
    fn test_selector_shape() {
        let selector = button_labelled(&["A", "B"]);
        assert_eq!(selector, "xpath///button[contains(., 'A') or contains(., 'B')]");
    }

    #[tokio::test]
    async fn test_reject_all_localized() {
        let dom = MemoryDom::new();
        let card = card(&dom);
        let reject = dom.append(Some(card), ElementSpec::new("button").text("Alles ablehnen"));
        let cx = context(&dom);

        let cmp = Admiral::new();
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.detect_popup(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(reject), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purposes_path_unchecks_popup_body() {
        let dom = MemoryDom::new();
        let card = card(&dom);
        let purposes = dom.append(Some(card), ElementSpec::new("button").text("Purposes"));
        let body = dom.append(None, ElementSpec::new("section"));
        let checkbox = dom.append(Some(body), ElementSpec::new("input").attr("type", "checkbox").checked());
        let footer = dom.append(Some(body), ElementSpec::new("div"));
        let save = dom.append(Some(footer), ElementSpec::new("button").text("Save & exit"));
        let cx = context(&dom);

        assert!(Admiral::new().opt_out(&cx).await);
        assert_eq!(dom.click_count(purposes), 1);
        assert_eq!(dom.click_count(checkbox), 1);
        assert_eq!(dom.click_count(save), 1);
    }
}
