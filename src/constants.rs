// src/constants.rs

/// Reserved token joining the elements of a list parameter in its string form.
/// It must never occur inside an element value.
pub const SEPARATOR_TOKEN: &str = "@@@__@@@";

/// Category label given to parameters that are not declared inside a `NODE`.
pub const DEFAULT_SECTION: &str = "default";

/// Name of the job file looked up in the current directory when neither a
/// descriptor nor a job file is given on the command line.
pub const DEFAULT_JOB_FILENAME: &str = "ctdwrap.toml";

// Element and attribute names of the CTD schema.
pub const TAG_TOOL: &str = "tool";
pub const TAG_PARAMETERS: &str = "PARAMETERS";
pub const TAG_NODE: &str = "NODE";
pub const TAG_ITEM: &str = "ITEM";
pub const TAG_ITEMLIST: &str = "ITEMLIST";
pub const TAG_LISTITEM: &str = "LISTITEM";
pub const TAG_CLI: &str = "cli";
pub const TAG_CLI_ELEMENT: &str = "clielement";
pub const TAG_MAPPING: &str = "mapping";

pub const ATTR_NAME: &str = "name";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_DESCRIPTION: &str = "description";
pub const ATTR_REQUIRED: &str = "required";
pub const ATTR_ADVANCED: &str = "advanced";
pub const ATTR_TAGS: &str = "tags";
pub const ATTR_RESTRICTIONS: &str = "restrictions";
pub const ATTR_SUPPORTED_FORMATS: &str = "supported_formats";
