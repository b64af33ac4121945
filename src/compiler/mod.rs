// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Config compiler: renders intent into BIND9's native configuration files.
//!
//! Rendering is pure. Identical intent always yields byte-identical output, which
//! [`writer::ArtifactWriter`] relies on to turn an unchanged push into a no-op.
//!
//! # Generated layout
//!
//! | File                    | Content                                          |
//! |-------------------------|--------------------------------------------------|
//! | `named.conf`            | includes, per-view keys, view includes by priority |
//! | `options.conf`          | global options, recursion limits, black holes     |
//! | `acl.conf`              | user ACLs (`any` / `none` are built in)           |
//! | `view_<id>.conf`        | one view block                                    |
//! | `forward_<id>.conf`     | forward zones of a view                           |
//! | `<view name>.nzf`       | zone index read by `allow-new-zones`              |
//! | `redirect_<id>`         | NXDOMAIN redirect zone data                       |
//! | `rpz_<id>`              | local-zone (response policy) data                 |
//! | `<zone file>`           | one per non-forward zone                          |

pub mod writer;

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::bind9::rndc::key_statement;
use crate::config::DnsConfig;
use crate::constants::{
    ACL_ANY, ACL_CONF_FILENAME, DEFAULT_SOA_EXPIRE_SECS, DEFAULT_SOA_NEGATIVE_TTL_SECS,
    DEFAULT_SOA_REFRESH_SECS, DEFAULT_SOA_RETRY_SECS, DEFAULT_ZONE_TTL_SECS,
    FORWARD_CONF_PREFIX, LOCAL_ZONE_FILE_PREFIX, LOCAL_ZONE_ORIGIN_PREFIX, MAIN_CONF_FILENAME,
    OPTIONS_CONF_FILENAME, REDIRECT_FILE_PREFIX, VIEW_CONF_PREFIX, ZONE_INDEX_SUFFIX,
};
use crate::errors::{AgentError, Result};
use crate::intent::{Intent, RedirectKind, View, Zone};

const NAMED_CONF_TEMPLATE: &str = include_str!("../../templates/named.conf.tmpl");
const OPTIONS_CONF_TEMPLATE: &str = include_str!("../../templates/named.conf.options.tmpl");
const VIEW_CONF_TEMPLATE: &str = include_str!("../../templates/view.conf.tmpl");
const ZONE_FILE_TEMPLATE: &str = include_str!("../../templates/zone.db.tmpl");

/// Set of rendered files, keyed by file name relative to the conf dir.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    files: BTreeMap<String, String>,
}

impl ArtifactSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(name.into(), content.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Hex SHA-256 over every file name and content, in name order.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, content) in &self.files {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(content.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Name of a view's include file
#[must_use]
pub fn view_conf_file(view_id: &str) -> String {
    format!("{VIEW_CONF_PREFIX}{view_id}.conf")
}

/// Name of a view's forward-zone index
#[must_use]
pub fn forward_conf_file(view_id: &str) -> String {
    format!("{FORWARD_CONF_PREFIX}{view_id}.conf")
}

/// Name of a view's zone index; BIND derives it from the view name
#[must_use]
pub fn zone_index_file(view_name: &str) -> String {
    format!("{view_name}{ZONE_INDEX_SUFFIX}")
}

/// Name of a view's NXDOMAIN redirect data file
#[must_use]
pub fn redirect_file(view_id: &str) -> String {
    format!("{REDIRECT_FILE_PREFIX}{view_id}")
}

/// Name of a view's local-zone data file
#[must_use]
pub fn local_zone_file(view_id: &str) -> String {
    format!("{LOCAL_ZONE_FILE_PREFIX}{view_id}")
}

/// Origin of a view's response-policy zone
#[must_use]
pub fn local_zone_origin(view_name: &str) -> String {
    format!("{LOCAL_ZONE_ORIGIN_PREFIX}.{view_name}")
}

/// Reject file names that would escape the conf dir.
///
/// # Errors
///
/// Returns a validation error for empty names, separators and `..`.
pub fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(AgentError::validation(format!(
            "'{name}' is not a valid file name"
        )));
    }
    Ok(())
}

/// Renders BIND9 artifacts for one conf dir.
#[derive(Debug, Clone)]
pub struct ConfigCompiler {
    conf_dir: PathBuf,
    rndc_key_file: PathBuf,
    rndc_key_name: String,
    rndc_port: u16,
    pid_file: PathBuf,
}

impl ConfigCompiler {
    #[must_use]
    pub fn new(config: &DnsConfig) -> Self {
        Self {
            conf_dir: config.conf_dir.clone(),
            rndc_key_file: config.rndc_key_file.clone(),
            rndc_key_name: config.rndc_key_name.clone(),
            rndc_port: config.rndc_port,
            pid_file: config.pid_file.clone(),
        }
    }

    /// Same compiler rendering paths under another directory
    #[must_use]
    pub fn with_conf_dir(&self, conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            conf_dir: conf_dir.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }

    /// Absolute path of the main configuration file
    #[must_use]
    pub fn main_conf_path(&self) -> PathBuf {
        self.conf_dir.join(MAIN_CONF_FILENAME)
    }

    fn path_of(&self, name: &str) -> String {
        self.conf_dir.join(name).display().to_string()
    }

    /// Render every artifact of the intent.
    ///
    /// # Errors
    ///
    /// Returns an artifact error if the priority list is corrupt, a referenced ACL
    /// is missing, or a zone file name is invalid.
    pub fn compile_full(&self, intent: &Intent) -> Result<ArtifactSet> {
        let mut set = ArtifactSet::new();
        set.insert(MAIN_CONF_FILENAME, self.compile_main(intent)?);
        set.insert(OPTIONS_CONF_FILENAME, self.compile_options(intent)?);
        set.insert(ACL_CONF_FILENAME, self.compile_acls(intent));

        for view in self.ordered_views(intent)? {
            set.insert(view_conf_file(&view.id), self.compile_view(intent, view)?);
            set.insert(
                forward_conf_file(&view.id),
                self.compile_forward_index(intent, view),
            );
            set.insert(
                zone_index_file(&view.name),
                self.compile_zone_index(intent, view)?,
            );
            set.insert(redirect_file(&view.id), self.compile_redirect(intent, view));
            set.insert(local_zone_file(&view.id), self.compile_local_zone(intent, view));

            for zone in intent.file_zones_in_view(&view.id) {
                check_file_name(&zone.zone_file)
                    .map_err(|e| AgentError::artifact(&zone.zone_file, e))?;
                set.insert(zone.zone_file.clone(), self.compile_zone_file(intent, zone));
            }
        }
        Ok(set)
    }

    /// Zone file plus the owning view's zone index.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown zone or view.
    pub fn compile_zone_scope(&self, intent: &Intent, zone_id: &str) -> Result<ArtifactSet> {
        let zone = intent.zones.get_required(zone_id)?;
        let view = intent.views.get_required(&zone.view_id)?;
        let mut set = ArtifactSet::new();
        set.insert(
            zone_index_file(&view.name),
            self.compile_zone_index(intent, view)?,
        );
        if !zone.is_forward() {
            check_file_name(&zone.zone_file)?;
            set.insert(zone.zone_file.clone(), self.compile_zone_file(intent, zone));
        }
        Ok(set)
    }

    /// Redirect and local-zone data files of one view.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown view.
    pub fn compile_view_policy(&self, intent: &Intent, view_id: &str) -> Result<ArtifactSet> {
        let view = intent.views.get_required(view_id)?;
        let mut set = ArtifactSet::new();
        set.insert(redirect_file(&view.id), self.compile_redirect(intent, view));
        set.insert(local_zone_file(&view.id), self.compile_local_zone(intent, view));
        Ok(set)
    }

    fn ordered_views<'a>(&self, intent: &'a Intent) -> Result<Vec<&'a View>> {
        intent
            .ordered_views()
            .map_err(|e| AgentError::artifact(MAIN_CONF_FILENAME, e))
    }

    /// Render `named.conf`.
    ///
    /// # Errors
    ///
    /// Returns an artifact error if the priority list cannot be walked.
    pub fn compile_main(&self, intent: &Intent) -> Result<String> {
        let views = self.ordered_views(intent)?;

        let view_keys: String = views.iter().map(|view| key_statement(&view.key)).collect();
        let view_includes: String = views
            .iter()
            .map(|view| format!("include \"{}\";\n", self.path_of(&view_conf_file(&view.id))))
            .collect();

        Ok(NAMED_CONF_TEMPLATE
            .replace(
                "{{RNDC_KEY_FILE}}",
                &self.rndc_key_file.display().to_string(),
            )
            .replace("{{OPTIONS_FILE}}", &self.path_of(OPTIONS_CONF_FILENAME))
            .replace("{{ACL_FILE}}", &self.path_of(ACL_CONF_FILENAME))
            .replace("{{VIEW_KEYS}}", &view_keys)
            .replace("{{VIEW_INCLUDES}}", &view_includes))
    }

    /// Render `options.conf`.
    ///
    /// # Errors
    ///
    /// Returns an artifact error if a black hole references a missing ACL.
    pub fn compile_options(&self, intent: &Intent) -> Result<String> {
        let mut black_holes = Vec::new();
        for hole in intent.black_holes.values() {
            let name = intent
                .acl_name(&hole.acl_id)
                .map_err(|e| AgentError::artifact(OPTIONS_CONF_FILENAME, e))?;
            black_holes.push(acl_ref(&name));
        }
        let blackhole = if black_holes.is_empty() {
            String::new()
        } else {
            format!("    blackhole {{ {} }};\n", join_statements(&black_holes))
        };

        let logging = if intent.global.log_enabled {
            "\nlogging {\n    channel query_log {\n        file \"query.log\" versions 3 size 20m;\n        print-time yes;\n        severity info;\n    };\n    category queries { query_log; };\n};\n"
        } else {
            ""
        };

        Ok(OPTIONS_CONF_TEMPLATE
            .replace("{{CONF_DIR}}", &self.conf_dir.display().to_string())
            .replace("{{PID_FILE}}", &self.pid_file.display().to_string())
            .replace("{{DNSSEC_VALIDATION}}", yes_no(intent.global.dnssec_enabled))
            .replace("{{QUERYLOG}}", yes_no(intent.global.log_enabled))
            .replace(
                "{{RECURSIVE_CLIENTS}}",
                &intent.recursive.max_clients.to_string(),
            )
            .replace(
                "{{FETCHES_PER_ZONE}}",
                &intent.recursive.max_fetches_per_zone.to_string(),
            )
            .replace("{{MAX_CACHE_TTL}}", &intent.global.ttl.to_string())
            .replace("{{BLACKHOLE}}", &blackhole)
            .replace("{{RNDC_PORT}}", &self.rndc_port.to_string())
            .replace("{{RNDC_KEY_NAME}}", &self.rndc_key_name)
            .replace("{{LOGGING}}", logging))
    }

    /// Render `acl.conf`; the reserved ACLs are built into BIND and skipped.
    #[must_use]
    pub fn compile_acls(&self, intent: &Intent) -> String {
        let mut out = String::from("// Generated by ddi-agent. Manual edits are overwritten.\n\n");
        let mut acls: Vec<_> = intent.acls.list(|acl| !acl.is_reserved());
        acls.sort_by(|a, b| a.name.cmp(&b.name));
        for acl in acls {
            let _ = writeln!(
                out,
                "acl \"{}\" {{ {} }};",
                acl.name,
                join_statements(&acl.ips)
            );
        }
        out
    }

    /// Render one view block.
    ///
    /// # Errors
    ///
    /// Returns an artifact error if the view references a missing ACL.
    pub fn compile_view(&self, intent: &Intent, view: &View) -> Result<String> {
        let file = view_conf_file(&view.id);
        let acl_name = |id: &str| {
            intent
                .acl_name(id)
                .map(|name| acl_ref(&name))
                .map_err(|e| AgentError::artifact(&file, e))
        };

        // Own key first, then every other view's key negated so signed traffic
        // cannot fall through into a lower-priority view, then the ACLs.
        let mut match_clients = vec![format!("key \"{}\"", view.key.name)];
        for other in intent.ordered_views().map_err(|e| AgentError::artifact(&file, e))? {
            if other.id != view.id {
                match_clients.push(format!("!key \"{}\"", other.key.name));
            }
        }
        for id in &view.acls {
            match_clients.push(acl_name(id)?);
        }

        let dns64 = match &view.dns64 {
            Some(dns64) => {
                let clients = acl_name(dns64.client_acl.as_deref().unwrap_or(ACL_ANY))?;
                let mapped = acl_name(dns64.mapped_acl.as_deref().unwrap_or(ACL_ANY))?;
                format!(
                    "    dns64 {} {{\n        clients {{ {clients}; }};\n        mapped {{ {mapped}; }};\n    }};\n",
                    dns64.prefix
                )
            }
            None => String::new(),
        };

        Ok(VIEW_CONF_TEMPLATE
            .replace("{{VIEW_NAME}}", &view.name)
            .replace("{{MATCH_CLIENTS}}", &join_statements(&match_clients))
            .replace("{{LOCAL_ZONE}}", &local_zone_origin(&view.name))
            .replace("{{DNS64}}", &dns64)
            .replace("{{REDIRECT_FILE}}", &self.path_of(&redirect_file(&view.id)))
            .replace(
                "{{LOCAL_ZONE_FILE}}",
                &self.path_of(&local_zone_file(&view.id)),
            )
            .replace(
                "{{FORWARD_FILE}}",
                &self.path_of(&forward_conf_file(&view.id)),
            ))
    }

    /// Zone statement body shared by the zone index and `rndc addzone`.
    #[must_use]
    pub fn zone_stanza(&self, zone: &Zone, view: &View) -> String {
        format!(
            "{{ type master; file \"{}\"; allow-update {{ key \"{}\"; }}; }};",
            self.path_of(&zone.zone_file),
            view.key.name
        )
    }

    /// Render a view's zone index; forward zones are not listed.
    ///
    /// # Errors
    ///
    /// Returns an artifact error for an invalid zone file name.
    pub fn compile_zone_index(&self, intent: &Intent, view: &View) -> Result<String> {
        let mut out = String::new();
        for zone in intent.file_zones_in_view(&view.id) {
            check_file_name(&zone.zone_file)
                .map_err(|e| AgentError::artifact(zone_index_file(&view.name), e))?;
            let _ = writeln!(out, "zone \"{}\" {}", zone.name, self.zone_stanza(zone, view));
        }
        Ok(out)
    }

    /// Render a view's forward zones.
    #[must_use]
    pub fn compile_forward_index(&self, intent: &Intent, view: &View) -> String {
        let mut out = String::from("// Generated by ddi-agent. Manual edits are overwritten.\n");
        for zone in intent.forward_zones_in_view(&view.id) {
            let _ = write!(
                out,
                "\nzone \"{}\" {{\n    type forward;\n    forward {};\n    forwarders {{ {} }};\n}};\n",
                zone.name,
                zone.forward_type.as_str(),
                join_statements(&zone.forwarders)
            );
        }
        out
    }

    /// Render one zone file; rdata is chosen by the zone's role.
    #[must_use]
    pub fn compile_zone_file(&self, intent: &Intent, zone: &Zone) -> String {
        let records: String = intent
            .records_in_zone(&zone.id)
            .iter()
            .map(|rr| {
                record_line(
                    &relative_owner(&rr.name),
                    rr.ttl,
                    &rr.rr_type,
                    rr.effective_rdata(zone.role),
                )
            })
            .collect();

        render_zone_data(
            &absolute(&zone.name),
            zone.ttl,
            zone.serial,
            &records,
        )
    }

    /// Render a view's NXDOMAIN redirect zone (origin `.`).
    #[must_use]
    pub fn compile_redirect(&self, intent: &Intent, view: &View) -> String {
        let records: String = intent
            .redirections_in_view(&view.id, RedirectKind::NxDomain)
            .iter()
            .map(|r| record_line(&absolute(&r.name), r.ttl, &r.rr_type, &r.rdata))
            .collect();
        render_zone_data(".", DEFAULT_ZONE_TTL_SECS, content_serial(&records), &records)
    }

    /// Render a view's local-zone (response policy) data.
    ///
    /// Owner names are the query names relative to the policy zone origin.
    #[must_use]
    pub fn compile_local_zone(&self, intent: &Intent, view: &View) -> String {
        let records: String = intent
            .redirections_in_view(&view.id, RedirectKind::LocalZone)
            .iter()
            .map(|r| {
                record_line(
                    r.name.trim_end_matches('.'),
                    r.ttl,
                    &r.rr_type,
                    &r.rdata,
                )
            })
            .collect();
        render_zone_data(
            &absolute(&local_zone_origin(&view.name)),
            DEFAULT_ZONE_TTL_SECS,
            content_serial(&records),
            &records,
        )
    }
}

fn render_zone_data(origin: &str, ttl: u32, serial: u32, records: &str) -> String {
    ZONE_FILE_TEMPLATE
        .replace("{{ORIGIN}}", origin)
        .replace("{{TTL}}", &ttl.to_string())
        .replace("{{SERIAL}}", &serial.to_string())
        .replace("{{REFRESH}}", &DEFAULT_SOA_REFRESH_SECS.to_string())
        .replace("{{RETRY}}", &DEFAULT_SOA_RETRY_SECS.to_string())
        .replace("{{EXPIRE}}", &DEFAULT_SOA_EXPIRE_SECS.to_string())
        .replace("{{NEGATIVE_TTL}}", &DEFAULT_SOA_NEGATIVE_TTL_SECS.to_string())
        .replace("{{RECORDS}}", records)
}

/// Serial for data files without a stored serial; changes whenever the data does.
fn content_serial(records: &str) -> u32 {
    let digest = Sha256::digest(records.as_bytes());
    let serial = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    serial.max(1)
}

fn record_line(owner: &str, ttl: u32, rr_type: &str, rdata: &str) -> String {
    let rr_type = rr_type.to_ascii_uppercase();
    let rdata = if rr_type == "TXT" && !rdata.starts_with('"') {
        format!("\"{}\"", rdata.replace('"', "\\\""))
    } else {
        rdata.to_string()
    };
    format!("{owner} {ttl} IN {rr_type} {rdata}\n")
}

fn relative_owner(name: &str) -> String {
    if name.is_empty() {
        "@".to_string()
    } else {
        name.to_string()
    }
}

fn absolute(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Reserved ACLs are keywords; user ACLs are quoted names.
fn acl_ref(name: &str) -> String {
    if crate::intent::is_reserved_acl(name) {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

fn join_statements<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("{};", item.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
