//! Page-script snippets addressable by id.
//!
//! Rules never carry code: an `eval` step names a snippet, and the bridge
//! ships the snippet source to the page context. Each entry is the source of
//! a zero-argument arrow function.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

static SNIPPETS: &[(&str, &str)] = &[
    ("EVAL_0", r##"() => console.log(1)"##),
    ("EVAL_CONSENTMANAGER_1", r##"() => window.__cmp && typeof __cmp("getCMPData") === "object""##),
    ("EVAL_CONSENTMANAGER_2", r##"() => !__cmp("consentStatus").userChoiceExists"##),
    ("EVAL_CONSENTMANAGER_3", r##"() => __cmp("setConsent", 0)"##),
    ("EVAL_CONSENTMANAGER_4", r##"() => __cmp("setConsent", 1)"##),
    ("EVAL_CONSENTMANAGER_5", r##"() => __cmp("consentStatus").userChoiceExists"##),
    ("EVAL_COOKIEBOT_1", r##"() => !!window.Cookiebot"##),
    ("EVAL_COOKIEBOT_2", r##"() => !window.Cookiebot.hasResponse && window.Cookiebot.dialog?.visible === true"##),
    ("EVAL_COOKIEBOT_3", r##"() => window.Cookiebot.withdraw() || true"##),
    ("EVAL_COOKIEBOT_4", r##"() => window.Cookiebot.hide() || true"##),
    ("EVAL_COOKIEBOT_5", r##"() => window.Cookiebot.declined === true"##),
    ("EVAL_KLARO_1", r##"() => {
  const config = globalThis.klaroConfig || globalThis.klaro?.getManager && globalThis.klaro.getManager().config;
  if (!config) {
    return true;
  }
  const optionalServices = (config.services || config.apps).filter((s) => !s.required).map((s) => s.name);
  if (klaro && klaro.getManager) {
    const manager = klaro.getManager();
    return optionalServices.every((name) => !manager.consents[name]);
  } else if (klaroConfig && klaroConfig.storageMethod === "cookie") {
    const cookieName = klaroConfig.cookieName || klaroConfig.storageName;
    const consents = JSON.parse(
      decodeURIComponent(
        document.cookie.split(";").find((c) => c.trim().startsWith(cookieName)).split("=")[1]
      )
    );
    return Object.keys(consents).filter((k) => optionalServices.includes(k)).every((k) => consents[k] === false);
  }
}"##),
    ("EVAL_KLARO_OPEN_POPUP", r##"() => {
  klaro.show(void 0, true);
}"##),
    ("EVAL_KLARO_TRY_API_OPT_OUT", r##"() => {
  if (window.klaro && typeof klaro.show === "function" && typeof klaro.getManager === "function") {
    try {
      klaro.getManager().changeAll(false);
      klaro.getManager().saveAndApplyConsents();
      return true;
    } catch (e) {
      console.warn(e);
      return false;
    }
  }
  return false;
}"##),
    ("EVAL_ONETRUST_1", r##"() => window.OnetrustActiveGroups.split(",").filter((s) => s.length > 0).length <= 1"##),
    ("EVAL_TRUSTARC_TOP", r##"() => window && window.truste && window.truste.eu.bindMap.prefCookie === "0""##),
    ("EVAL_TRUSTARC_FRAME_TEST", r##"() => window && window.QueryString && window.QueryString.preferences === "0""##),
    ("EVAL_TRUSTARC_FRAME_GTM", r##"() => window && window.QueryString && window.QueryString.gtm === "1""##),
    ("EVAL_ABC_TEST", r##"() => document.cookie.includes("trackingconsent")"##),
    ("EVAL_ADROLL_0", r##"() => !document.cookie.includes("__adroll_fpc")"##),
    ("EVAL_ALMACMP_0", r##"() => document.cookie.includes('"name":"Google","consent":false')"##),
    ("EVAL_AFFINITY_SERIF_COM_0", r##"() => document.cookie.includes("serif_manage_cookies_viewed") && !document.cookie.includes("serif_allow_analytics")"##),
    ("EVAL_ARBEITSAGENTUR_TEST", r##"() => document.cookie.includes("cookie_consent=denied")"##),
    ("EVAL_AXEPTIO_0", r##"() => document.cookie.includes("axeptio_authorized_vendors=%2C%2C")"##),
    ("EVAL_BAHN_TEST", r##"() => utag.gdpr.getSelectedCategories().length === 1"##),
    ("EVAL_BING_0", r##"() => document.cookie.includes("AD=0")"##),
    ("EVAL_BLOCKSY_0", r##"() => document.cookie.includes("blocksy_cookies_consent_accepted=no")"##),
    ("EVAL_BORLABS_0", r##"() => !JSON.parse(
  decodeURIComponent(
    document.cookie.split(";").find((c) => c.indexOf("borlabs-cookie") !== -1).split("=", 2)[1]
  )
).consents.statistics"##),
    ("EVAL_BUNDESREGIERUNG_DE_0", r##"() => document.cookie.match("cookie-allow-tracking=0")"##),
    ("EVAL_CANVA_0", r##"() => !document.cookie.includes("gtm_fpc_engagement_event")"##),
    ("EVAL_CC_BANNER2_0", r##"() => !!document.cookie.match(/sncc=[^;]+D%3Dtrue/)"##),
    ("EVAL_CLICKIO_0", r##"() => document.cookie.includes("__lxG__consent__v2_daisybit=")"##),
    ("EVAL_CLINCH_0", r##"() => document.cookie.includes("ctc_rejected=1")"##),
    ("EVAL_COOKIECONSENT2_TEST", r##"() => document.cookie.includes("cc_cookie=")"##),
    ("EVAL_COOKIECONSENT3_TEST", r##"() => document.cookie.includes("cc_cookie=")"##),
    ("EVAL_COINBASE_0", r##"() => JSON.parse(decodeURIComponent(document.cookie.match(/cm_(eu|default)_preferences=([0-9a-zA-Z\\{\\}\\[\\]%:]*);?/)[2])).consent.length <= 1"##),
    ("EVAL_COMPLIANZ_BANNER_0", r##"() => document.cookie.includes("cmplz_banner-status=dismissed")"##),
    ("EVAL_COOKIE_LAW_INFO_0", r##"() => CLI.disableAllCookies() || CLI.reject_close() || true"##),
    ("EVAL_COOKIE_LAW_INFO_1", r##"() => document.cookie.indexOf("cookielawinfo-checkbox-non-necessary=yes") === -1"##),
    ("EVAL_COOKIE_LAW_INFO_DETECT", r##"() => !!window.CLI"##),
    ("EVAL_COOKIE_MANAGER_POPUP_0", r##"() => JSON.parse(
  document.cookie.split(";").find((c) => c.trim().startsWith("CookieLevel")).split("=")[1]
).social === false"##),
    ("EVAL_COOKIEALERT_0", r##"() => document.querySelector("body").removeAttribute("style") || true"##),
    ("EVAL_COOKIEALERT_1", r##"() => document.querySelector("body").removeAttribute("style") || true"##),
    ("EVAL_COOKIEALERT_2", r##"() => window.CookieConsent.declined === true"##),
    ("EVAL_COOKIEFIRST_0", r##"() => ((o) => o.performance === false && o.functional === false && o.advertising === false)(
  JSON.parse(
    decodeURIComponent(
      document.cookie.split(";").find((c) => c.indexOf("cookiefirst") !== -1).trim()
    ).split("=")[1]
  )
)"##),
    ("EVAL_COOKIEFIRST_1", r##"() => document.querySelectorAll("button[data-cookiefirst-accent-color=true][role=checkbox]:not([disabled])").forEach((i) => i.getAttribute("aria-checked") === "true" && i.click()) || true"##),
    ("EVAL_COOKIEINFORMATION_0", r##"() => CookieInformation.declineAllCategories() || true"##),
    ("EVAL_COOKIEINFORMATION_1", r##"() => CookieInformation.submitAllCategories() || true"##),
    ("EVAL_COOKIEINFORMATION_2", r##"() => document.cookie.includes("CookieInformationConsent=")"##),
    ("EVAL_COOKIEYES_0", r##"() => document.cookie.includes("advertisement:no")"##),
    ("EVAL_DAILYMOTION_0", r##"() => !!document.cookie.match("dm-euconsent-v2")"##),
    ("EVAL_DNDBEYOND_TEST", r##"() => document.cookie.includes("cookie-consent=denied")"##),
    ("EVAL_DSGVO_0", r##"() => !document.cookie.includes("sp_dsgvo_cookie_settings")"##),
    ("EVAL_DUNELM_0", r##"() => document.cookie.includes("cc_functional=0") && document.cookie.includes("cc_targeting=0")"##),
    ("EVAL_ETSY_0", r##"() => document.querySelectorAll(".gdpr-overlay-body input").forEach((toggle) => {
  toggle.checked = false;
}) || true"##),
    ("EVAL_ETSY_1", r##"() => document.querySelector(".gdpr-overlay-view button[data-wt-overlay-close]").click() || true"##),
    ("EVAL_EU_COOKIE_COMPLIANCE_0", r##"() => document.cookie.indexOf("cookie-agreed=2") === -1"##),
    ("EVAL_EU_COOKIE_LAW_0", r##"() => !document.cookie.includes("euCookie")"##),
    ("EVAL_EZOIC_0", r##"() => ezCMP.handleAcceptAllClick()"##),
    ("EVAL_EZOIC_1", r##"() => !!document.cookie.match(/ez-consent-tcf/)"##),
    ("EVAL_FIDES_DETECT_POPUP", r##"() => window.Fides?.initialized"##),
    ("EVAL_GOOGLE_0", r##"() => !!document.cookie.match(/SOCS=CAE/)"##),
    ("EVAL_HEMA_TEST_0", r##"() => document.cookie.includes("cookies_rejected=1")"##),
    ("EVAL_IUBENDA_0", r##"() => document.querySelectorAll(".purposes-item input[type=checkbox]:not([disabled])").forEach((x) => {
  if (x.checked) x.click();
}) || true"##),
    ("EVAL_IUBENDA_1", r##"() => !!document.cookie.match(/_iub_cs-\d+=/)"##),
    ("EVAL_IWINK_TEST", r##"() => document.cookie.includes("cookie_permission_granted=no")"##),
    ("EVAL_JQUERY_COOKIEBAR_0", r##"() => !document.cookie.includes("cookies-state=accepted")"##),
    ("EVAL_KETCH_TEST", r##"() => document.cookie.includes("_ketch_consent_v1_")"##),
    ("EVAL_MEDIAVINE_0", r##"() => document.querySelectorAll('[data-name="mediavine-gdpr-cmp"] input[type=checkbox]').forEach((x) => x.checked && x.click()) || true"##),
    ("EVAL_MICROSOFT_0", r##"() => Array.from(document.querySelectorAll("div > button")).filter((el) => el.innerText.match("Reject|Ablehnen"))[0].click() || true"##),
    ("EVAL_MICROSOFT_1", r##"() => Array.from(document.querySelectorAll("div > button")).filter((el) => el.innerText.match("Accept|Annehmen"))[0].click() || true"##),
    ("EVAL_MICROSOFT_2", r##"() => !!document.cookie.match("MSCC|GHCC")"##),
    ("EVAL_MOOVE_0", r##"() => document.querySelectorAll("#moove_gdpr_cookie_modal input").forEach((i) => {
  if (!i.disabled) i.checked = i.name === "moove_gdpr_strict_cookies" || i.id === "moove_gdpr_strict_cookies";
}) || true"##),
    ("EVAL_ONENINETWO_0", r##"() => document.cookie.includes("CC_ADVERTISING=NO") && document.cookie.includes("CC_ANALYTICS=NO")"##),
    ("EVAL_OPENAI_TEST", r##"() => document.cookie.includes("oai-allow-ne=false")"##),
    ("EVAL_OPERA_0", r##"() => document.cookie.includes("cookie_consent_essential=true") && !document.cookie.includes("cookie_consent_marketing=true")"##),
    ("EVAL_PAYPAL_0", r##"() => document.cookie.includes("cookie_prefs") === true"##),
    ("EVAL_PRIMEBOX_0", r##"() => !document.cookie.includes("cb-enabled=accepted")"##),
    ("EVAL_PUBTECH_0", r##"() => document.cookie.includes("euconsent-v2") && (document.cookie.match(/.YAAAAAAAAAAA/) || document.cookie.match(/.aAAAAAAAAAAA/) || document.cookie.match(/.YAAACFgAAAAA/))"##),
    ("EVAL_REDDIT_0", r##"() => document.cookie.includes("eu_cookie={%22opted%22:true%2C%22nonessential%22:false}")"##),
    ("EVAL_ROBLOX_TEST", r##"() => document.cookie.includes("RBXcb")"##),
    ("EVAL_SKYSCANNER_TEST", r##"() => document.cookie.match(/gdpr=[^;]*adverts:::false/) && !document.cookie.match(/gdpr=[^;]*init:::true/)"##),
    ("EVAL_SIRDATA_UNBLOCK_SCROLL", r##"() => {
  document.documentElement.classList.forEach((cls) => {
    if (cls.startsWith("sd-cmp-")) document.documentElement.classList.remove(cls);
  });
  return true;
}"##),
    ("EVAL_SNIGEL_0", r##"() => !!document.cookie.match("snconsent")"##),
    ("EVAL_STEAMPOWERED_0", r##"() => JSON.parse(
  decodeURIComponent(
    document.cookie.split(";").find((s) => s.trim().startsWith("cookieSettings")).split("=")[1]
  )
).preference_state === 2"##),
    ("EVAL_SVT_TEST", r##"() => document.cookie.includes('cookie-consent-1={"optedIn":true,"functionality":false,"statistics":false}')"##),
    ("EVAL_TAKEALOT_0", r##"() => document.body.classList.remove("freeze") || (document.body.style = "") || true"##),
    ("EVAL_TARTEAUCITRON_0", r##"() => tarteaucitron.userInterface.respondAll(false) || true"##),
    ("EVAL_TARTEAUCITRON_1", r##"() => tarteaucitron.userInterface.respondAll(true) || true"##),
    ("EVAL_TARTEAUCITRON_2", r##"() => document.cookie.match(/tarteaucitron=[^;]*/)?.[0].includes("false")"##),
    ("EVAL_TAUNTON_TEST", r##"() => document.cookie.includes("taunton_user_consent_submitted=true")"##),
    ("EVAL_TEALIUM_0", r##"() => typeof window.utag !== "undefined" && typeof utag.gdpr === "object""##),
    ("EVAL_TEALIUM_1", r##"() => utag.gdpr.setConsentValue(false) || true"##),
    ("EVAL_TEALIUM_DONOTSELL", r##"() => utag.gdpr.dns?.setDnsState(false) || true"##),
    ("EVAL_TEALIUM_2", r##"() => utag.gdpr.setConsentValue(true) || true"##),
    ("EVAL_TEALIUM_3", r##"() => utag.gdpr.getConsentState() !== 1"##),
    ("EVAL_TEALIUM_DONOTSELL_CHECK", r##"() => utag.gdpr.dns?.getDnsState() !== 1"##),
    ("EVAL_TESLA_TEST", r##"() => document.cookie.includes("tsla-cookie-consent=rejected")"##),
    ("EVAL_TESTCMP_STEP", r##"() => !!document.querySelector("#reject-all")"##),
    ("EVAL_TESTCMP_0", r##"() => window.results.results[0] === "button_clicked""##),
    ("EVAL_TESTCMP_COSMETIC_0", r##"() => window.results.results[0] === "banner_hidden""##),
    ("EVAL_THEFREEDICTIONARY_0", r##"() => cmpUi.showPurposes() || cmpUi.rejectAll() || true"##),
    ("EVAL_THEFREEDICTIONARY_1", r##"() => cmpUi.allowAll() || true"##),
    ("EVAL_THEVERGE_0", r##"() => document.cookie.includes("_duet_gdpr_acknowledged=1")"##),
    ("EVAL_TWCC_TEST", r##"() => document.cookie.includes("twCookieConsent=")"##),
    ("EVAL_UBUNTU_COM_0", r##"() => document.cookie.includes("_cookies_accepted=essential")"##),
    ("EVAL_UK_COOKIE_CONSENT_0", r##"() => !document.cookie.includes("catAccCookies")"##),
    ("EVAL_USERCENTRICS_API_0", r##"() => typeof UC_UI === "object""##),
    ("EVAL_USERCENTRICS_API_1", r##"() => !!UC_UI.closeCMP()"##),
    ("EVAL_USERCENTRICS_API_2", r##"() => !!UC_UI.denyAllConsents()"##),
    ("EVAL_USERCENTRICS_API_3", r##"() => !!UC_UI.acceptAllConsents()"##),
    ("EVAL_USERCENTRICS_API_4", r##"() => !!UC_UI.closeCMP()"##),
    ("EVAL_USERCENTRICS_API_5", r##"() => UC_UI.areAllConsentsAccepted() === true"##),
    ("EVAL_USERCENTRICS_API_6", r##"() => UC_UI.areAllConsentsAccepted() === false"##),
    ("EVAL_USERCENTRICS_BUTTON_0", r##"() => JSON.parse(localStorage.getItem("usercentrics")).consents.every((c) => c.isEssential || !c.consentStatus)"##),
    ("EVAL_WAITROSE_0", r##"() => Array.from(document.querySelectorAll("label[id$=cookies-deny-label]")).forEach((e) => e.click()) || true"##),
    ("EVAL_WAITROSE_1", r##"() => document.cookie.includes("wtr_cookies_advertising=0") && document.cookie.includes("wtr_cookies_analytics=0")"##),
    ("EVAL_WP_COOKIE_NOTICE_0", r##"() => document.cookie.includes("wpl_viewed_cookie=no")"##),
    ("EVAL_XE_TEST", r##"() => document.cookie.includes("xeConsentState={%22performance%22:false%2C%22marketing%22:false%2C%22compliance%22:false}")"##),
    ("EVAL_XING_0", r##"() => document.cookie.includes("userConsent=%7B%22marketing%22%3Afalse")"##),
    ("EVAL_YOUTUBE_DESKTOP_0", r##"() => !!document.cookie.match(/SOCS=CAE/)"##),
    ("EVAL_YOUTUBE_MOBILE_0", r##"() => !!document.cookie.match(/SOCS=CAE/)"##),
];

static INDEX: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| SNIPPETS.iter().copied().collect());

/// Source of the snippet registered under `id`.
///
/// # Errors
///
/// Returns [`Error::SnippetNotFound`] for unregistered ids.
pub fn snippet(id: &str) -> Result<&'static str> {
    INDEX.get(id).copied().ok_or_else(|| Error::snippet_not_found(id))
}

/// Returns `true` if a snippet is registered under `id`.
#[inline]
#[must_use]
pub fn contains(id: &str) -> bool {
    INDEX.contains_key(id)
}

/// Number of registered snippets.
#[must_use]
pub fn len() -> usize {
    INDEX.len()
}

/// Wraps a snippet into an immediately invoked expression.
#[must_use]
pub fn function_body(source: &str) -> String {
    format!("({source})()")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(contains("EVAL_ONETRUST_1"));
        assert!(snippet("EVAL_COOKIEBOT_1").is_ok_and(|s| s.contains("Cookiebot")));
        assert!(snippet("EVAL_DOES_NOT_EXIST").is_err_and(|e| e.is_eval_error()));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_eq!(len(), SNIPPETS.len());
    }

    #[test]
    fn test_function_body() {
        assert_eq!(function_body("() => true"), "(() => true)()");
    }
}
