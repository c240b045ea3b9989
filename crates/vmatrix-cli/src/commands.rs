//! Subcommand handlers.
//!
//! Handlers print results to stdout. Anything that changes state saves
//! it before returning.

use crate::Command;
use anyhow::{anyhow, bail, Context as _, Result};
use std::path::Path;
use std::process::ExitCode;
use vmatrix_auth::{check_sid_name, parse_submission, GrantTable, Permission};
use vmatrix_runtime::{view_from_referer, MatrixStrategy, StateStore};
use vmatrix_types::{TryNew, ViewName};

pub(crate) struct Context<'a> {
    pub(crate) strategy: &'a MatrixStrategy,
    pub(crate) store: &'a StateStore,
}

impl Context<'_> {
    pub(crate) fn run(&self, command: Command) -> Result<ExitCode> {
        match command {
            Command::Check {
                sid,
                permission,
                view,
            } => return self.check(&sid, &permission, view.as_deref()),
            Command::Referer { url } => return Ok(referer(&url)),
            Command::Principals => self.principals(),
            Command::Permissions { view_only } => self.permissions(view_only),
            Command::Show { view } => self.show(&view)?,
            Command::AddView { view } => self.add_view(&view)?,
            Command::RemoveView { view } => self.remove_view(&view)?,
            Command::Grant {
                view,
                sid,
                permission,
            } => self.grant(&view, &sid, &permission)?,
            Command::GlobalGrant { sid, permission } => self.global_grant(&sid, &permission)?,
            Command::BlockInheritance { view, blocks } => self.block_inheritance(&view, blocks)?,
            Command::ImportForm { view, file } => self.import_form(&view, &file)?,
            Command::CheckName { name } => {
                let sid = check_sid_name(&name)?;
                println!("{sid}");
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn resolve(&self, id: &str) -> Result<Permission> {
        self.strategy
            .catalog()
            .resolve(id)
            .ok_or_else(|| anyhow!("unknown permission: {id}"))
    }

    fn save(&self) -> Result<()> {
        self.store
            .save(self.strategy)
            .with_context(|| format!("saving {}", self.store.path().display()))
    }

    fn check(&self, sid: &str, permission: &str, view: Option<&str>) -> Result<ExitCode> {
        let permission = self.resolve(permission)?;
        let acl = match view {
            Some(view) => self.strategy.get_acl(view)?,
            None => self.strategy.root_acl(),
        };
        tracing::debug!(policy = ?acl.policy(), depth = acl.depth(), "Evaluating");

        if acl.has_permission(sid, &permission) {
            println!("granted");
            Ok(ExitCode::SUCCESS)
        } else {
            println!("denied");
            Ok(ExitCode::from(1))
        }
    }

    fn principals(&self) {
        for sid in self.strategy.all_known_sids_for_display() {
            println!("{sid}");
        }
    }

    fn permissions(&self, view_only: bool) {
        let catalog = self.strategy.catalog();
        let permissions = if view_only {
            catalog.view_permissions()
        } else {
            catalog.permissions()
        };
        for permission in permissions {
            match permission.implied_by() {
                Some(parent) => println!("{permission}\t(implied by {parent})"),
                None => println!("{permission}"),
            }
        }
    }

    fn show(&self, view: &str) -> Result<()> {
        println!("view: {view}");
        let Some(table) = self.strategy.view_table(view)? else {
            println!("no table (uses global)");
            return Ok(());
        };
        println!("blocks inheritance: {}", table.blocks_inheritance());

        for sid in table.sids() {
            let granted: Vec<String> = table
                .all_granted_permissions()
                .iter()
                .filter(|(_, sids)| sids.contains(sid))
                .map(|(permission, _)| permission.to_string())
                .collect();
            println!("{sid}: {}", granted.join(", "));
        }
        Ok(())
    }

    fn add_view(&self, view: &str) -> Result<()> {
        let name = ViewName::try_new(view.to_string())?;
        if !self.strategy.add_view(name) {
            bail!("view already exists: {view}");
        }
        self.save()?;
        println!("added view {view}");
        Ok(())
    }

    fn remove_view(&self, view: &str) -> Result<()> {
        if self.strategy.remove_view(view).is_none() {
            bail!("unknown view: {view}");
        }
        self.save()?;
        println!("removed view {view}");
        Ok(())
    }

    fn grant(&self, view: &str, sid: &str, permission: &str) -> Result<()> {
        let sid = check_sid_name(sid)?;
        let permission = self.resolve(permission)?;
        self.strategy.edit_view_table(view, |table| {
            table.grant(&permission, sid.clone());
        })?;
        self.save()?;
        println!("granted {permission} to {sid} on {view}");
        Ok(())
    }

    fn global_grant(&self, sid: &str, permission: &str) -> Result<()> {
        let sid = check_sid_name(sid)?;
        let permission = self.resolve(permission)?;
        let mut table = self
            .strategy
            .global_table()
            .map(|t| GrantTable::clone(&t))
            .unwrap_or_default();
        table.grant(&permission, sid.clone());
        self.strategy.set_global_table(table);
        self.save()?;
        println!("granted {permission} to {sid} globally");
        Ok(())
    }

    fn block_inheritance(&self, view: &str, blocks: bool) -> Result<()> {
        self.strategy
            .edit_view_table(view, |table| table.set_blocks_inheritance(blocks))?;
        self.save()?;
        println!("{view}: blocks inheritance = {blocks}");
        Ok(())
    }

    fn import_form(&self, view: &str, file: &Path) -> Result<()> {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("reading {}", file.display()))?;
        let form: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", file.display()))?;

        let table = parse_submission(&form, self.strategy.catalog().as_ref())?;
        let grants = table.len();
        self.strategy.set_view_table(view, table)?;
        self.save()?;
        println!("imported {grants} grant(s) into {view}");
        Ok(())
    }
}

fn referer(url: &str) -> ExitCode {
    match view_from_referer(url) {
        Some(view) => {
            println!("{view}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("not a view configure URL: {url}");
            ExitCode::from(1)
        }
    }
}
