//! Shared Java project fixtures for integration tests.
#![allow(dead_code)]

use std::path::Path;

use assert_fs::TempDir;
use assert_fs::prelude::*;

use callscope::core::Workspace;
use callscope::infra::Config;

/// Source root used by every fixture
pub const SRC: &str = "src/main/java";

pub const CONTROLLER: &str = "src/main/java/com/shop/web/OrderController.java";
pub const SERVICE: &str = "src/main/java/com/shop/service/OrderService.java";
pub const REPOSITORY: &str = "src/main/java/com/shop/repo/OrderRepository.java";
pub const DATABASE: &str = "src/main/java/com/shop/db/Database.java";

/// A throwaway Java project on disk
pub struct JavaProject {
    pub dir: TempDir,
}

impl JavaProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    /// Write `src` to the repo-relative `path`
    pub fn file(&self, path: &str, src: &str) -> &Self {
        self.dir.child(path).write_str(src).expect("write source");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn workspace(&self) -> Workspace {
        self.workspace_with(Config::default())
    }

    pub fn workspace_with(&self, config: Config) -> Workspace {
        Workspace::open(self.path(), config).expect("open workspace")
    }
}

/// Controller -> Service -> Repository -> Database, one hop per layer.
///
/// `OrderService.cancel` calls `OrderRepository.delete`, which calls nothing.
pub fn shop() -> JavaProject {
    let project = JavaProject::new();

    project
        .file(
            CONTROLLER,
            r#"package com.shop.web;

import com.shop.service.OrderService;

@RestController
public class OrderController {
    private final OrderService service = new OrderService();

    @PostMapping
    public String submit(String sku) {
        return service.placeOrder(sku);
    }
}
"#,
        )
        .file(
            SERVICE,
            r#"package com.shop.service;

import com.shop.repo.OrderRepository;

@Service
public class OrderService {
    private OrderRepository repo;

    @Transactional
    public String placeOrder(String sku) {
        return repo.save(sku);
    }

    public void cancel(String id) {
        repo.delete(id);
    }
}
"#,
        )
        .file(
            REPOSITORY,
            r#"package com.shop.repo;

import com.shop.db.Database;

public class OrderRepository {
    private Database db;

    public String save(String sku) {
        db.write(sku);
        return sku;
    }

    public void delete(String id) {
    }
}
"#,
        )
        .file(
            DATABASE,
            r#"package com.shop.db;

public class Database {
    public void write(String row) {
    }
}
"#,
        );

    project
}
