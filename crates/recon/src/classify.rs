use crate::model::MasterRow;

pub const SOURCE_USER_SIGN_UP: &str = "User Sign Up";
pub const SOURCE_DRAFT_TRANSACTION: &str = "Draft Transaction";
pub const SOURCE_LEAD: &str = "Lead";

/// Derive `referral_source_category` from the referral source.
///
/// Sign-ups are online, draft transactions offline; lead referrals take the
/// category recorded on the lead. Anything else has no category.
pub fn source_category(row: &MasterRow) -> Option<String> {
    match row.referral.referral_source.as_deref()? {
        SOURCE_USER_SIGN_UP => Some("Online".into()),
        SOURCE_DRAFT_TRANSACTION => Some("Offline".into()),
        SOURCE_LEAD => row.source_category().map(str::to_owned),
        _ => None,
    }
}
