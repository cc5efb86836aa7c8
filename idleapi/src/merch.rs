//! Bulk item listings for the in-game `$merch` command.

use crate::api::query::MerchFilter;
use crate::model::{Hand, Item, ItemType};
use crate::paginator::{BLURPLE, Page};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::collections::HashSet;

/// Most ids `merch` puts in one message.
pub const MERCH_CAP: usize = 150;
/// Longest message Discord accepts.
pub const MESSAGE_LIMIT: usize = 2000;

pub const NO_ITEMS: &str = "No items to merch!";
pub const TRUNCATED: &str =
    "This is not the complete list, but rather a shortened one to allow processing the command.";
pub const TOO_LONG: &str =
    "Too many items; message could not be sent! Try setting a lower `--limit`";
pub const FILE_INTRO: &str =
    "Here is your list!\nPlease note that due to API limitations, this list might be incomplete.";
pub const NO_ATTACH: &str = "I don't have permission to attach files here :(";
pub const LIST_FILENAME: &str = "items.txt";

/// Options of `xmerch`.
#[derive(Parser, Debug, Default, Clone, PartialEq)]
#[command(
    name = "xmerch",
    no_binary_name = true,
    disable_help_flag = true
)]
pub struct XmerchArgs {
    /// Shows this message.
    #[arg(long)]
    pub help: bool,
    /// A Discord user, either a mention, a name or a user ID. Defaults to the command author if not given.
    #[arg(short = 'u', long)]
    pub user: Option<String>,
    /// The highest stat to include, this is inclusive. Unlimited if not given.
    #[arg(long = "upper", visible_alias = "hi", default_value_t = 0, allow_negative_numbers = true)]
    pub upper: i64,
    /// The lowest stat to include, this is inclusive. Defaults to 0.
    #[arg(long = "lower", visible_alias = "lo", default_value_t = 0, allow_negative_numbers = true)]
    pub lower: i64,
    /// The item types to include. All types by default. Can be multiple (view examples page).
    #[arg(short = 't', long = "type", visible_alias = "types", num_args = 1..)]
    pub types: Vec<String>,
    /// The item hands to include. All hands by default. Can be multiple (view examples page).
    #[arg(short = 'h', long = "hand", visible_alias = "hands", num_args = 1..)]
    pub hands: Vec<String>,
    /// The highest value to include, this is inclusive. Unlimited if not given.
    #[arg(long = "valueupper", visible_alias = "vh", default_value_t = 0, allow_negative_numbers = true)]
    pub value_upper: i64,
    /// The lowest value to include, this is inclusive. Defaults to 0.
    #[arg(long = "valuelower", visible_alias = "vl", default_value_t = 0, allow_negative_numbers = true)]
    pub value_lower: i64,
    /// The lowest item ID to include, this is inclusive. Defaults to 0.
    #[arg(long = "idlower", visible_alias = "idlo", default_value_t = 0, allow_negative_numbers = true)]
    pub id_lower: i64,
    /// The highest item ID to include, this is inclusive. Unlimited if not given.
    #[arg(long = "idupper", visible_alias = "idhi", default_value_t = 0, allow_negative_numbers = true)]
    pub id_upper: i64,
    /// A list of item IDs to exclude. Can be multiple (view examples page).
    #[arg(long = "exclude", visible_alias = "ex", num_args = 1.., allow_negative_numbers = true)]
    pub exclude: Vec<i64>,
    /// The amount of items to include in the output. Above 100 may be hard to process, above 150 may be impossible to send. Defaults to 100.
    #[arg(long, default_value_t = 100, allow_negative_numbers = true)]
    pub limit: i64,
    /// Sends the full list as an attached file, after exclusion but before limiting.
    #[arg(long)]
    pub file: bool,
    /// Escapes the code block so the list is easier to copy.
    #[arg(long = "copy", visible_alias = "cc")]
    pub copy: bool,
}

const LEGACY_FLAGS: [&str; 8] = ["-hi", "-lo", "-vh", "-vl", "-idlo", "-idhi", "-ex", "-cc"];

impl XmerchArgs {
    /// Splits `raw` like a shell would, then parses it, accepting the old
    /// single-dash long flags.
    pub fn parse_raw(raw: &str) -> Result<XmerchArgs, clap::Error> {
        let Some(tokens) = shlex::split(raw) else {
            return Err(XmerchArgs::command().error(
                ErrorKind::InvalidValue,
                "Could not split the arguments, check for unclosed quotes or a trailing backslash.",
            ));
        };
        let tokens = tokens.into_iter().map(|token| {
            if LEGACY_FLAGS.contains(&token.as_str()) {
                format!("-{token}")
            } else {
                token
            }
        });
        XmerchArgs::try_parse_from(tokens)
    }

    pub fn valid_types(&self) -> Vec<ItemType> {
        self.types
            .iter()
            .filter_map(|raw| raw.parse().ok())
            .collect()
    }

    pub fn valid_hands(&self) -> Vec<Hand> {
        self.hands.iter().filter_map(|raw| Hand::parse(raw)).collect()
    }

    pub fn limit(&self) -> usize {
        self.limit.unsigned_abs() as usize
    }

    /// Zero means "no bound" for every numeric filter, negatives are taken as absolute.
    pub fn filter(&self, user: u64) -> MerchFilter {
        let bound = |value: i64| match value.abs() {
            0 => None,
            value => Some(value),
        };
        MerchFilter {
            user,
            stat_lower: bound(self.lower),
            stat_upper: bound(self.upper),
            types: self.valid_types(),
            hands: self.valid_hands(),
            value_lower: bound(self.value_lower),
            value_upper: bound(self.value_upper),
            id_lower: bound(self.id_lower),
            id_upper: bound(self.id_upper),
        }
    }
}

/// The flag descriptions five per page, followed by an examples page.
pub fn help_pages(prefix: &str) -> Vec<Page> {
    let command = XmerchArgs::command();
    let arguments: Vec<&clap::Arg> = command.get_arguments().collect();
    let mut pages: Vec<Page> = arguments
        .chunks(5)
        .map(|chunk| {
            chunk.iter().fold(
                Page::new("xmerch help")
                    .description(
                        "Here you will find an explanation of all arguments that the command can take.",
                    )
                    .color(BLURPLE),
                |page, arg| {
                    let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
                    page.field(option_strings(arg), help, false)
                },
            )
        })
        .collect();

    pages.push(
        Page::new("xmerch help - Examples")
            .description("Some examples to familiarize you with the system.")
            .color(BLURPLE)
            .field(
                "Getting Scythes and Hammers",
                format!("`{prefix}xmerch --types Scythe Hammer`"),
                false,
            )
            .field(
                "Getting right, left and any handed",
                format!("`{prefix}xmerch --hand right left any`"),
                false,
            )
            .field(
                "Getting all items except 123 and 543",
                format!("`{prefix}xmerch --exclude 123 543`"),
                false,
            )
            .field(
                "Getting all items from 5 to 20 stat",
                format!("`{prefix}xmerch --hi 20 --lo 5`"),
                false,
            )
            .field(
                "Getting someone's two handed items below 80 damage, above 200 value, as a file output",
                format!(
                    "`{prefix}xmerch --user 123456789 --hand both --hi 80 --vl 199 --file`\n\
                     The user does not have to be a member of your server, you can always use their User ID."
                ),
                false,
            ),
    );
    pages
}

fn option_strings(arg: &clap::Arg) -> String {
    let mut names = Vec::new();
    if let Some(short) = arg.get_short() {
        names.push(format!("-{short}"));
    }
    if let Some(long) = arg.get_long() {
        names.push(format!("--{long}"));
    }
    if let Some(aliases) = arg.get_visible_aliases() {
        names.extend(aliases.into_iter().map(|alias| format!("--{alias}")));
    }
    names.join(", ")
}

/// Stat range of a `merch` invocation after defaulting and swapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatBounds {
    pub lower: i64,
    pub upper: i64,
    /// The caller gave lower above upper.
    pub swapped: bool,
}

/// Bounds apply only when `upper` is given. `lower` then defaults to 0.
pub fn stat_bounds(upper: Option<i64>, lower: Option<i64>) -> Option<StatBounds> {
    let upper = upper?.abs();
    let lower = lower.unwrap_or(0).abs();
    Some(if lower > upper {
        StatBounds {
            lower: upper,
            upper: lower,
            swapped: true,
        }
    } else {
        StatBounds {
            lower,
            upper,
            swapped: false,
        }
    })
}

/// Unequipped ids in upstream order, without duplicates or excluded ids.
pub fn collect_ids(items: Vec<Item>, excluded: &HashSet<i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(Item::is_listed_unequipped)
        .map(|item| item.id)
        .filter(|id| !excluded.contains(id) && seen.insert(*id))
        .collect()
}

pub fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// The `$merch` line in a code block. `copy` escapes the fence so it survives copying.
pub fn merch_block(ids: &[i64], copy: bool) -> String {
    if copy {
        format!("\\`\\`\\`\n$merch {}\n\\`\\`\\`", join_ids(ids))
    } else {
        format!("```$merch {}```", join_ids(ids))
    }
}
