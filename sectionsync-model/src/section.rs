//! Compiled-in section catalogue.
//!
//! A section names one class of remote data that is refreshed independently
//! for an entity. Every section carries a static refresh TTL, the credential
//! scopes its fetch needs and a stable storage key of the form
//! `"<family>:<name>"`. Adding a section is a code change.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ModelError;

const MINUTE: u64 = 60;
const HOUR: u64 = 3600;

/// Entity kind a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SectionFamily {
    Character,
    Corporation,
    General,
}

impl SectionFamily {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SectionFamily::Character => "character",
            SectionFamily::Corporation => "corporation",
            SectionFamily::General => "general",
        }
    }

    /// All sections of this family, in catalogue order.
    pub fn sections(&self) -> Vec<Section> {
        match self {
            SectionFamily::Character => CharacterSection::ALL
                .iter()
                .copied()
                .map(Section::Character)
                .collect(),
            SectionFamily::Corporation => CorporationSection::ALL
                .iter()
                .copied()
                .map(Section::Corporation)
                .collect(),
            SectionFamily::General => GeneralSection::ALL
                .iter()
                .copied()
                .map(Section::General)
                .collect(),
        }
    }
}

impl fmt::Display for SectionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionFamily {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "character" => Ok(SectionFamily::Character),
            "corporation" => Ok(SectionFamily::Corporation),
            "general" => Ok(SectionFamily::General),
            other => Err(ModelError::UnknownFamily(other.to_string())),
        }
    }
}

/// Sections refreshed per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CharacterSection {
    Assets,
    Attributes,
    Contracts,
    Implants,
    IndustryJobs,
    JumpClones,
    Location,
    MailLabels,
    MailLists,
    Mails,
    Notifications,
    Online,
    Planets,
    Roles,
    Ship,
    Skillqueue,
    Skills,
    WalletBalance,
    WalletJournal,
    WalletTransactions,
}

impl CharacterSection {
    pub const ALL: [CharacterSection; 20] = [
        CharacterSection::Assets,
        CharacterSection::Attributes,
        CharacterSection::Contracts,
        CharacterSection::Implants,
        CharacterSection::IndustryJobs,
        CharacterSection::JumpClones,
        CharacterSection::Location,
        CharacterSection::MailLabels,
        CharacterSection::MailLists,
        CharacterSection::Mails,
        CharacterSection::Notifications,
        CharacterSection::Online,
        CharacterSection::Planets,
        CharacterSection::Roles,
        CharacterSection::Ship,
        CharacterSection::Skillqueue,
        CharacterSection::Skills,
        CharacterSection::WalletBalance,
        CharacterSection::WalletJournal,
        CharacterSection::WalletTransactions,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CharacterSection::Assets => "assets",
            CharacterSection::Attributes => "attributes",
            CharacterSection::Contracts => "contracts",
            CharacterSection::Implants => "implants",
            CharacterSection::IndustryJobs => "industry_jobs",
            CharacterSection::JumpClones => "jump_clones",
            CharacterSection::Location => "location",
            CharacterSection::MailLabels => "mail_labels",
            CharacterSection::MailLists => "mail_lists",
            CharacterSection::Mails => "mails",
            CharacterSection::Notifications => "notifications",
            CharacterSection::Online => "online",
            CharacterSection::Planets => "planets",
            CharacterSection::Roles => "roles",
            CharacterSection::Ship => "ship",
            CharacterSection::Skillqueue => "skillqueue",
            CharacterSection::Skills => "skills",
            CharacterSection::WalletBalance => "wallet_balance",
            CharacterSection::WalletJournal => "wallet_journal",
            CharacterSection::WalletTransactions => "wallet_transactions",
        }
    }

    /// Time until the cached data of this section becomes stale.
    pub const fn ttl(&self) -> Duration {
        let secs = match self {
            CharacterSection::Assets => HOUR,
            CharacterSection::Attributes => 2 * MINUTE,
            CharacterSection::Contracts => 5 * MINUTE,
            CharacterSection::Implants => 2 * MINUTE,
            CharacterSection::IndustryJobs => 5 * MINUTE,
            CharacterSection::JumpClones => 2 * MINUTE,
            // remote minimum is 5 seconds
            CharacterSection::Location => 5 * MINUTE,
            // remote minimum is 30 seconds
            CharacterSection::MailLabels => MINUTE,
            CharacterSection::MailLists => 2 * MINUTE,
            CharacterSection::Mails => MINUTE,
            CharacterSection::Notifications => 10 * MINUTE,
            CharacterSection::Online => 5 * MINUTE,
            CharacterSection::Planets => 10 * MINUTE,
            CharacterSection::Roles => HOUR,
            CharacterSection::Ship => 5 * MINUTE,
            CharacterSection::Skillqueue => 2 * MINUTE,
            CharacterSection::Skills => 2 * MINUTE,
            CharacterSection::WalletBalance => 2 * MINUTE,
            CharacterSection::WalletJournal => HOUR,
            CharacterSection::WalletTransactions => HOUR,
        };
        Duration::from_secs(secs)
    }

    /// Credential scopes required to fetch this section.
    pub const fn scopes(&self) -> &'static [&'static str] {
        match self {
            CharacterSection::Assets => &[
                "esi-assets.read_assets.v1",
                "esi-universe.read_structures.v1",
            ],
            CharacterSection::Attributes | CharacterSection::Skills => {
                &["esi-skills.read_skills.v1"]
            }
            CharacterSection::Contracts => &[
                "esi-contracts.read_character_contracts.v1",
                "esi-universe.read_structures.v1",
            ],
            CharacterSection::Implants => &["esi-clones.read_implants.v1"],
            CharacterSection::IndustryJobs => &[
                "esi-industry.read_character_jobs.v1",
                "esi-universe.read_structures.v1",
            ],
            CharacterSection::JumpClones => &[
                "esi-clones.read_clones.v1",
                "esi-universe.read_structures.v1",
            ],
            CharacterSection::Location => &[
                "esi-location.read_location.v1",
                "esi-universe.read_structures.v1",
            ],
            CharacterSection::MailLabels | CharacterSection::MailLists => {
                &["esi-mail.read_mail.v1"]
            }
            CharacterSection::Mails => {
                &["esi-mail.organize_mail.v1", "esi-mail.read_mail.v1"]
            }
            CharacterSection::Notifications => &[
                "esi-characters.read_notifications.v1",
                "esi-universe.read_structures.v1",
            ],
            CharacterSection::Online => &["esi-location.read_online.v1"],
            CharacterSection::Planets => &["esi-planets.manage_planets.v1"],
            CharacterSection::Roles => {
                &["esi-characters.read_corporation_roles.v1"]
            }
            CharacterSection::Ship => &["esi-location.read_ship_type.v1"],
            CharacterSection::Skillqueue => &["esi-skills.read_skillqueue.v1"],
            CharacterSection::WalletBalance
            | CharacterSection::WalletJournal => {
                &["esi-wallet.read_character_wallet.v1"]
            }
            CharacterSection::WalletTransactions => &[
                "esi-wallet.read_character_wallet.v1",
                "esi-universe.read_structures.v1",
            ],
        }
    }
}

/// Sections refreshed per corporation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CorporationSection {
    Divisions,
    IndustryJobs,
    WalletBalances,
    WalletJournal1,
    WalletJournal2,
    WalletJournal3,
    WalletJournal4,
    WalletJournal5,
    WalletJournal6,
    WalletJournal7,
    WalletTransactions1,
    WalletTransactions2,
    WalletTransactions3,
    WalletTransactions4,
    WalletTransactions5,
    WalletTransactions6,
    WalletTransactions7,
}

impl CorporationSection {
    pub const ALL: [CorporationSection; 17] = [
        CorporationSection::Divisions,
        CorporationSection::IndustryJobs,
        CorporationSection::WalletBalances,
        CorporationSection::WalletJournal1,
        CorporationSection::WalletJournal2,
        CorporationSection::WalletJournal3,
        CorporationSection::WalletJournal4,
        CorporationSection::WalletJournal5,
        CorporationSection::WalletJournal6,
        CorporationSection::WalletJournal7,
        CorporationSection::WalletTransactions1,
        CorporationSection::WalletTransactions2,
        CorporationSection::WalletTransactions3,
        CorporationSection::WalletTransactions4,
        CorporationSection::WalletTransactions5,
        CorporationSection::WalletTransactions6,
        CorporationSection::WalletTransactions7,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CorporationSection::Divisions => "divisions",
            CorporationSection::IndustryJobs => "industry_jobs",
            CorporationSection::WalletBalances => "wallet_balances",
            CorporationSection::WalletJournal1 => "wallet_journal_1",
            CorporationSection::WalletJournal2 => "wallet_journal_2",
            CorporationSection::WalletJournal3 => "wallet_journal_3",
            CorporationSection::WalletJournal4 => "wallet_journal_4",
            CorporationSection::WalletJournal5 => "wallet_journal_5",
            CorporationSection::WalletJournal6 => "wallet_journal_6",
            CorporationSection::WalletJournal7 => "wallet_journal_7",
            CorporationSection::WalletTransactions1 => "wallet_transactions_1",
            CorporationSection::WalletTransactions2 => "wallet_transactions_2",
            CorporationSection::WalletTransactions3 => "wallet_transactions_3",
            CorporationSection::WalletTransactions4 => "wallet_transactions_4",
            CorporationSection::WalletTransactions5 => "wallet_transactions_5",
            CorporationSection::WalletTransactions6 => "wallet_transactions_6",
            CorporationSection::WalletTransactions7 => "wallet_transactions_7",
        }
    }

    /// Wallet division (1-7) this section belongs to, if any.
    pub const fn division(&self) -> Option<u8> {
        match self {
            CorporationSection::WalletJournal1
            | CorporationSection::WalletTransactions1 => Some(1),
            CorporationSection::WalletJournal2
            | CorporationSection::WalletTransactions2 => Some(2),
            CorporationSection::WalletJournal3
            | CorporationSection::WalletTransactions3 => Some(3),
            CorporationSection::WalletJournal4
            | CorporationSection::WalletTransactions4 => Some(4),
            CorporationSection::WalletJournal5
            | CorporationSection::WalletTransactions5 => Some(5),
            CorporationSection::WalletJournal6
            | CorporationSection::WalletTransactions6 => Some(6),
            CorporationSection::WalletJournal7
            | CorporationSection::WalletTransactions7 => Some(7),
            CorporationSection::Divisions
            | CorporationSection::IndustryJobs
            | CorporationSection::WalletBalances => None,
        }
    }

    const fn is_wallet_transactions(&self) -> bool {
        matches!(
            self,
            CorporationSection::WalletTransactions1
                | CorporationSection::WalletTransactions2
                | CorporationSection::WalletTransactions3
                | CorporationSection::WalletTransactions4
                | CorporationSection::WalletTransactions5
                | CorporationSection::WalletTransactions6
                | CorporationSection::WalletTransactions7
        )
    }

    /// Time until the cached data of this section becomes stale.
    pub const fn ttl(&self) -> Duration {
        let secs = match self {
            CorporationSection::IndustryJobs
            | CorporationSection::WalletBalances => 5 * MINUTE,
            // journals, transactions and divisions change rarely
            _ => HOUR,
        };
        Duration::from_secs(secs)
    }

    /// Credential scopes required to fetch this section.
    pub const fn scopes(&self) -> &'static [&'static str] {
        match self {
            CorporationSection::Divisions => {
                &["esi-corporations.read_divisions.v1"]
            }
            CorporationSection::IndustryJobs => {
                &["esi-industry.read_corporation_jobs.v1"]
            }
            _ if self.is_wallet_transactions() => &[
                "esi-wallet.read_corporation_wallets.v1",
                "esi-universe.read_structures.v1",
            ],
            _ => &["esi-wallet.read_corporation_wallets.v1"],
        }
    }
}

/// Sections that are not tied to an account, e.g. market prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeneralSection {
    Characters,
    Corporations,
    Entities,
    MarketPrices,
    Types,
}

impl GeneralSection {
    pub const ALL: [GeneralSection; 5] = [
        GeneralSection::Characters,
        GeneralSection::Corporations,
        GeneralSection::Entities,
        GeneralSection::MarketPrices,
        GeneralSection::Types,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            GeneralSection::Characters => "characters",
            GeneralSection::Corporations => "corporations",
            GeneralSection::Entities => "entities",
            GeneralSection::MarketPrices => "market_prices",
            GeneralSection::Types => "types",
        }
    }

    /// Time until the cached data of this section becomes stale.
    pub const fn ttl(&self) -> Duration {
        let secs = match self {
            GeneralSection::Characters | GeneralSection::Corporations => {
                4 * HOUR
            }
            GeneralSection::Entities | GeneralSection::Types => 24 * HOUR,
            GeneralSection::MarketPrices => 6 * HOUR,
        };
        Duration::from_secs(secs)
    }
}

/// Any section known to the engine.
///
/// Sections are persisted by their storage key (`"<family>:<name>"`),
/// which is what [`fmt::Display`] renders and [`FromStr`] parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Character(CharacterSection),
    Corporation(CorporationSection),
    General(GeneralSection),
}

impl Section {
    /// Every compiled-in section across all families.
    pub fn all() -> impl Iterator<Item = Section> {
        CharacterSection::ALL
            .into_iter()
            .map(Section::Character)
            .chain(CorporationSection::ALL.into_iter().map(Section::Corporation))
            .chain(GeneralSection::ALL.into_iter().map(Section::General))
    }

    pub const fn family(&self) -> SectionFamily {
        match self {
            Section::Character(_) => SectionFamily::Character,
            Section::Corporation(_) => SectionFamily::Corporation,
            Section::General(_) => SectionFamily::General,
        }
    }

    /// Section name without the family prefix, e.g. `industry_jobs`.
    pub const fn name(&self) -> &'static str {
        match self {
            Section::Character(s) => s.as_str(),
            Section::Corporation(s) => s.as_str(),
            Section::General(s) => s.as_str(),
        }
    }

    /// Stable storage key, e.g. `character:industry_jobs`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.family().as_str(), self.name())
    }

    /// Refresh time-to-live.
    pub const fn ttl(&self) -> Duration {
        match self {
            Section::Character(s) => s.ttl(),
            Section::Corporation(s) => s.ttl(),
            Section::General(s) => s.ttl(),
        }
    }

    pub const fn scopes(&self) -> &'static [&'static str] {
        match self {
            Section::Character(s) => s.scopes(),
            Section::Corporation(s) => s.scopes(),
            Section::General(_) => &[],
        }
    }

    /// General sections are fetched anonymously.
    pub const fn requires_credential(&self) -> bool {
        !matches!(self, Section::General(_))
    }

    /// Human readable name, e.g. `Wallet Journal 3`.
    pub fn display_name(&self) -> String {
        self.name()
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().chain(chars).collect::<String>()
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family().as_str(), self.name())
    }
}

impl FromStr for Section {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (family, name) = s
            .split_once(':')
            .ok_or_else(|| ModelError::UnknownSection(s.to_string()))?;
        let family: SectionFamily = family.parse()?;
        family
            .sections()
            .into_iter()
            .find(|section| section.name() == name)
            .ok_or_else(|| ModelError::UnknownSection(s.to_string()))
    }
}

impl From<CharacterSection> for Section {
    fn from(section: CharacterSection) -> Self {
        Section::Character(section)
    }
}

impl From<CorporationSection> for Section {
    fn from(section: CorporationSection) -> Self {
        Section::Corporation(section)
    }
}

impl From<GeneralSection> for Section {
    fn from(section: GeneralSection) -> Self {
        Section::General(section)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Section {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Section {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
