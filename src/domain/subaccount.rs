//! Validated report entities built from the raw configuration document.
//!
//! Raw config entries use optional fields everywhere so a single malformed
//! entry can be rejected with a reason instead of failing deserialization of
//! the whole document. The validation pass runs once at the start of a run
//! and produces a filtered worklist of [`Subaccount`] values; everything
//! downstream operates on validated data only.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{ProfileConfig, RecipientConfig, SubaccountConfig};

/// Why a profile or subaccount entry was rejected during validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidEntry {
    /// A required field is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// The subaccount references a profile that does not exist or was
    /// itself rejected.
    #[error("assigned profile `{0}` does not exist or is invalid")]
    UnknownProfile(String),

    /// A recipient entry lacks `to_email` or `to_name`.
    #[error("recipient entry is missing to_email or to_name")]
    IncompleteRecipient,
}

/// A validated report profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportProfile {
    /// Provider-side template id used for the outbound message.
    pub template_id: i64,
    /// Subject template with positional `{}` placeholders for the
    /// subaccount name and the report date.
    pub subject: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    pub from_name: String,
    /// Per-profile time format override for detail rows.
    pub time_format: Option<String>,
    /// Statuses that get itemized detail rows, not just a count.
    pub report_in_detail: BTreeSet<String>,
    /// Profile-level default for the no-details skip policy.
    pub skip_if_no_details: Option<bool>,
    /// Profile-level default for the no-data skip policy.
    pub skip_if_no_data: Option<bool>,
}

impl ReportProfile {
    /// Validates a raw profile entry, rejecting it on the first missing
    /// required field.
    pub fn validate(raw: &ProfileConfig) -> Result<Self, InvalidEntry> {
        let template_id = raw
            .template_id
            .ok_or(InvalidEntry::MissingField("template_id"))?;
        let subject = raw
            .subject
            .clone()
            .ok_or(InvalidEntry::MissingField("subject"))?;
        let from_email = raw
            .from_email
            .clone()
            .ok_or(InvalidEntry::MissingField("from_email"))?;
        let from_name = raw
            .from_name
            .clone()
            .ok_or(InvalidEntry::MissingField("from_name"))?;

        Ok(Self {
            template_id,
            subject,
            from_email,
            from_name,
            time_format: raw.time_format.clone(),
            report_in_detail: raw.report_in_detail.iter().cloned().collect(),
            skip_if_no_details: raw.skip_if_no_details,
            skip_if_no_data: raw.skip_if_no_data,
        })
    }
}

/// A report recipient with both address and display name present.
#[derive(Debug, Clone)]
pub struct ReportRecipient {
    /// Destination address.
    pub email: String,
    /// Display name.
    pub name: String,
}

impl ReportRecipient {
    fn validate(raw: &RecipientConfig) -> Result<Self, InvalidEntry> {
        match (&raw.to_email, &raw.to_name) {
            (Some(email), Some(name)) => Ok(Self {
                email: email.clone(),
                name: name.clone(),
            }),
            _ => Err(InvalidEntry::IncompleteRecipient),
        }
    }
}

/// A validated subaccount report entry, ready for the sync loop.
#[derive(Debug, Clone)]
pub struct Subaccount {
    /// Configured subaccount name; must match the provider's key directory.
    pub name: String,
    /// The resolved report profile.
    pub profile: ReportProfile,
    /// Schedule mask of ISO weekday digits, e.g. `"135"`.
    pub report_days: String,
    /// Report recipients.
    pub recipients: Vec<ReportRecipient>,
    skip_if_no_details: Option<bool>,
    skip_if_no_data: Option<bool>,
}

impl Subaccount {
    /// Validates a raw subaccount entry against the set of valid profiles.
    pub fn validate(
        raw: &SubaccountConfig,
        profiles: &BTreeMap<String, ReportProfile>,
        default_report_days: &str,
    ) -> Result<Self, InvalidEntry> {
        let name = raw.name.clone().ok_or(InvalidEntry::MissingField("name"))?;
        let profile_name = raw
            .profile
            .clone()
            .ok_or(InvalidEntry::MissingField("profile"))?;
        let profile = profiles
            .get(&profile_name)
            .cloned()
            .ok_or(InvalidEntry::UnknownProfile(profile_name))?;

        let raw_recipients = raw
            .recipients
            .as_ref()
            .ok_or(InvalidEntry::MissingField("recipients"))?;
        let recipients = raw_recipients
            .iter()
            .map(ReportRecipient::validate)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            profile,
            report_days: raw
                .report_days
                .clone()
                .unwrap_or_else(|| default_report_days.to_owned()),
            recipients,
            skip_if_no_details: raw.skip_if_no_details,
            skip_if_no_data: raw.skip_if_no_data,
        })
    }

    /// Whether this subaccount reports on the given ISO weekday digit
    /// (`'1'` = Monday .. `'7'` = Sunday).
    pub fn scheduled_on(&self, weekday_digit: char) -> bool {
        self.report_days.contains(weekday_digit)
    }

    /// Effective no-details skip policy: subaccount override, then profile
    /// default, then off.
    pub fn skip_if_no_details(&self) -> bool {
        self.skip_if_no_details
            .or(self.profile.skip_if_no_details)
            .unwrap_or(false)
    }

    /// Effective no-data skip policy: subaccount override, then profile
    /// default, then off.
    pub fn skip_if_no_data(&self) -> bool {
        self.skip_if_no_data
            .or(self.profile.skip_if_no_data)
            .unwrap_or(false)
    }
}
