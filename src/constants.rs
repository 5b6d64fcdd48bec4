// src/constants.rs

/// Name of the configuration directory (inside the platform config dir).
pub const CONFIG_DIR_NAME: &str = "cmdform";

/// Name of the main configuration file (inside the configuration directory).
pub const CONFIG_FILENAME: &str = "cmdform.toml";

/// Environment variable that points to an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "CMDFORM_CONFIG";

/// Default location of the outbox used by the file transport.
pub const DEFAULT_OUTBOX_DIR: &str = "~/.local/share/cmdform/outbox";

/// Top-level model entry holding the selected instances.
pub const INSTANCE_NAMES_FIELD: &str = "instance_names";

/// Top-level model entry holding the command parameters.
pub const PARAMETERS_FIELD: &str = "parameters";

/// Top-level model entry holding the request comment (immediate mode only).
pub const COMMENT_FIELD: &str = "comment";

/// Top-level model entry holding the scheduling block (job mode only).
pub const JOB_FIELD: &str = "job";

/// Permission checked before a request can be created.
pub const REQUEST_CREATE_ACTION: &str = "request:create";

/// Permission checked before a job can be created.
pub const JOB_CREATE_ACTION: &str = "job:create";

/// Route prefix of the request detail view.
pub const REQUESTS_ROUTE: &str = "/requests";

/// Route prefix of the job detail view.
pub const JOBS_ROUTE: &str = "/jobs";
