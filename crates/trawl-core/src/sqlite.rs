use std::collections::HashMap;

use rusqlite::{params, Connection, Result as SqlResult};

use crate::store::GraphStore;
use crate::types::{
    EmbeddingRecord, Graph, GraphError, GraphNode, NodeLabel, ScopeKind, StoredScope,
};

const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed implementation of the GraphStore trait.
///
/// Doubles as the reference implementation of the contract: `upsert` is
/// idempotent on node UUIDs and `(type, from, to)` triples, and deleting a
/// file removes its whole subgraph including embeddings.
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Open or create a graph database at the given path.
    pub fn open(path: &str) -> Result<Self, GraphError> {
        let conn = Connection::open(path)?;
        let store = SqliteGraphStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory graph database (for testing).
    pub fn in_memory() -> Result<Self, GraphError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteGraphStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), GraphError> {
        self.conn.execute_batch(
            "
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS trawl_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Nodes
            CREATE TABLE IF NOT EXISTS nodes (
                uuid TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                name TEXT NOT NULL,
                path TEXT,
                absolute_path TEXT,
                project_id TEXT NOT NULL DEFAULT '',
                content_hash TEXT,
                properties TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_nodes_file ON nodes(absolute_path);
            CREATE INDEX IF NOT EXISTS idx_nodes_project ON nodes(project_id);
            CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);
            CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(name);

            -- Relationships
            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY,
                rel_type TEXT NOT NULL,
                from_uuid TEXT NOT NULL,
                to_uuid TEXT NOT NULL,
                properties TEXT NOT NULL DEFAULT '{}',
                UNIQUE (rel_type, from_uuid, to_uuid)
            );
            CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_uuid);
            CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_uuid);

            -- Embedding vectors, keyed so restoration can match them back
            CREATE TABLE IF NOT EXISTS embeddings (
                node_uuid TEXT NOT NULL,
                file TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                field TEXT NOT NULL CHECK (field IN ('name', 'description', 'content')),
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                vector TEXT NOT NULL,
                PRIMARY KEY (node_uuid, field)
            );
            CREATE INDEX IF NOT EXISTS idx_embeddings_file ON embeddings(file);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO trawl_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;

        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<u32, GraphError> {
        let version: String = self.conn.query_row(
            "SELECT value FROM trawl_meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        version
            .parse()
            .map_err(|e| GraphError::Internal(format!("invalid schema version: {e}")))
    }

    /// Total node count (diagnostics).
    pub fn node_count(&self) -> Result<usize, GraphError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Total relationship count (diagnostics).
    pub fn edge_count(&self) -> Result<usize, GraphError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_node(row: &rusqlite::Row) -> SqlResult<GraphNode> {
        let label_str: String = row.get("label")?;
        let props_str: String = row.get("properties")?;
        Ok(GraphNode {
            uuid: row.get("uuid")?,
            label: NodeLabel::from_str_label(&label_str).unwrap_or(NodeLabel::File),
            name: row.get("name")?,
            path: row.get("path")?,
            absolute_path: row.get("absolute_path")?,
            project_id: row.get("project_id")?,
            content_hash: row.get("content_hash")?,
            properties: serde_json::from_str(&props_str).unwrap_or_default(),
        })
    }

    fn row_to_embedding(row: &rusqlite::Row) -> SqlResult<EmbeddingRecord> {
        let vector_str: String = row.get("vector")?;
        Ok(EmbeddingRecord {
            node_uuid: row.get("node_uuid")?,
            file: row.get("file")?,
            content_hash: row.get("content_hash")?,
            field: row.get("field")?,
            provider: row.get("provider")?,
            model: row.get("model")?,
            vector: serde_json::from_str(&vector_str).unwrap_or_default(),
        })
    }

    fn placeholders(n: usize) -> String {
        let mut s = String::with_capacity(n * 2);
        for i in 0..n {
            if i > 0 {
                s.push(',');
            }
            s.push('?');
        }
        s
    }
}

impl GraphStore for SqliteGraphStore {
    fn upsert(&mut self, graph: &Graph) -> Result<(), GraphError> {
        let tx = self.conn.transaction()?;
        {
            let mut node_stmt = tx.prepare(
                "INSERT INTO nodes (uuid, label, name, path, absolute_path, project_id, content_hash, properties, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
                 ON CONFLICT(uuid) DO UPDATE SET
                     label = excluded.label,
                     name = excluded.name,
                     path = excluded.path,
                     absolute_path = excluded.absolute_path,
                     project_id = excluded.project_id,
                     content_hash = excluded.content_hash,
                     properties = excluded.properties,
                     updated_at = datetime('now')",
            )?;
            for node in &graph.nodes {
                let props = serde_json::to_string(&node.properties)
                    .map_err(|e| GraphError::Internal(e.to_string()))?;
                node_stmt.execute(params![
                    node.uuid,
                    node.label.as_str(),
                    node.name,
                    node.path,
                    node.absolute_path,
                    node.project_id,
                    node.content_hash,
                    props,
                ])?;
            }

            let mut edge_stmt = tx.prepare(
                "INSERT OR IGNORE INTO edges (rel_type, from_uuid, to_uuid, properties)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for rel in &graph.relationships {
                let props = serde_json::to_string(&rel.properties)
                    .map_err(|e| GraphError::Internal(e.to_string()))?;
                edge_stmt.execute(params![
                    rel.rel_type.as_str(),
                    rel.from,
                    rel.to,
                    props,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_nodes_for_files(
        &mut self,
        files: &[String],
        project_id: Option<&str>,
    ) -> Result<usize, GraphError> {
        if files.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut uuids: Vec<String> = Vec::new();
        {
            let ph = Self::placeholders(files.len());
            let sql = match project_id {
                Some(_) => format!(
                    "SELECT uuid FROM nodes WHERE absolute_path IN ({ph}) AND project_id = ?{}",
                    files.len() + 1
                ),
                None => format!("SELECT uuid FROM nodes WHERE absolute_path IN ({ph})"),
            };
            let mut stmt = tx.prepare(&sql)?;
            let mut bind: Vec<&dyn rusqlite::ToSql> =
                files.iter().map(|f| f as &dyn rusqlite::ToSql).collect();
            if let Some(pid) = project_id.as_ref() {
                bind.push(pid as &dyn rusqlite::ToSql);
            }
            let rows = stmt.query_map(bind.as_slice(), |row| row.get::<_, String>(0))?;
            for row in rows {
                uuids.push(row?);
            }
        }
        if !uuids.is_empty() {
            let ph = Self::placeholders(uuids.len());
            let bind: Vec<&dyn rusqlite::ToSql> =
                uuids.iter().map(|u| u as &dyn rusqlite::ToSql).collect();
            tx.execute(
                &format!("DELETE FROM embeddings WHERE node_uuid IN ({ph})"),
                bind.as_slice(),
            )?;
            // The edge may reference the node from either side
            tx.execute(
                &format!("DELETE FROM edges WHERE from_uuid IN ({ph})"),
                bind.as_slice(),
            )?;
            tx.execute(
                &format!("DELETE FROM edges WHERE to_uuid IN ({ph})"),
                bind.as_slice(),
            )?;
            tx.execute(
                &format!("DELETE FROM nodes WHERE uuid IN ({ph})"),
                bind.as_slice(),
            )?;
        }
        tx.commit()?;
        Ok(uuids.len())
    }

    fn resolve_chunk_parents(
        &self,
        parent_uuids: &[String],
    ) -> Result<HashMap<String, GraphNode>, GraphError> {
        let mut map = HashMap::new();
        if parent_uuids.is_empty() {
            return Ok(map);
        }
        let ph = Self::placeholders(parent_uuids.len());
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM nodes WHERE uuid IN ({ph})"))?;
        let bind: Vec<&dyn rusqlite::ToSql> = parent_uuids
            .iter()
            .map(|u| u as &dyn rusqlite::ToSql)
            .collect();
        let rows = stmt.query_map(bind.as_slice(), Self::row_to_node)?;
        for row in rows {
            let node = row?;
            map.insert(node.uuid.clone(), node);
        }
        Ok(map)
    }

    fn scopes_for_files(&self, files: &[String]) -> Result<Vec<StoredScope>, GraphError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let ph = Self::placeholders(files.len());
        let mut stmt = self.conn.prepare(&format!(
            "SELECT * FROM nodes WHERE label = 'Scope' AND absolute_path IN ({ph})"
        ))?;
        let bind: Vec<&dyn rusqlite::ToSql> =
            files.iter().map(|f| f as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(bind.as_slice(), Self::row_to_node)?;
        let mut scopes = Vec::new();
        for row in rows {
            let node = row?;
            let kind = node.scope_kind().unwrap_or(ScopeKind::Function);
            scopes.push(StoredScope {
                uuid: node.uuid,
                name: node.name,
                file: node.absolute_path.unwrap_or_default(),
                kind,
            });
        }
        Ok(scopes)
    }

    fn embeddings_for_files(&self, files: &[String]) -> Result<Vec<EmbeddingRecord>, GraphError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let ph = Self::placeholders(files.len());
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM embeddings WHERE file IN ({ph})"))?;
        let bind: Vec<&dyn rusqlite::ToSql> =
            files.iter().map(|f| f as &dyn rusqlite::ToSql).collect();
        let rows = stmt.query_map(bind.as_slice(), Self::row_to_embedding)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn put_embedding(&mut self, record: &EmbeddingRecord) -> Result<(), GraphError> {
        let vector = serde_json::to_string(&record.vector)
            .map_err(|e| GraphError::Internal(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO embeddings (node_uuid, file, content_hash, field, provider, model, vector)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(node_uuid, field) DO UPDATE SET
                 file = excluded.file,
                 content_hash = excluded.content_hash,
                 provider = excluded.provider,
                 model = excluded.model,
                 vector = excluded.vector",
            params![
                record.node_uuid,
                record.file,
                record.content_hash,
                record.field,
                record.provider,
                record.model,
                vector,
            ],
        )?;
        Ok(())
    }

    fn node(&self, uuid: &str) -> Result<Option<GraphNode>, GraphError> {
        let mut stmt = self.conn.prepare("SELECT * FROM nodes WHERE uuid = ?1")?;
        let mut rows = stmt.query_map(params![uuid], Self::row_to_node)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn nodes_for_file(&self, file: &str) -> Result<Vec<GraphNode>, GraphError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM nodes WHERE absolute_path = ?1")?;
        let rows = stmt.query_map(params![file], Self::row_to_node)?;
        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }

    fn dirty_nodes(&self, project_id: Option<&str>) -> Result<Vec<GraphNode>, GraphError> {
        let sql = match project_id {
            Some(_) => {
                "SELECT * FROM nodes n
                 WHERE n.content_hash IS NOT NULL AND n.project_id = ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM embeddings e
                       WHERE e.node_uuid = n.uuid AND e.content_hash = n.content_hash
                   )"
            }
            None => {
                "SELECT * FROM nodes n
                 WHERE n.content_hash IS NOT NULL
                   AND NOT EXISTS (
                       SELECT 1 FROM embeddings e
                       WHERE e.node_uuid = n.uuid AND e.content_hash = n.content_hash
                   )"
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut nodes = Vec::new();
        if let Some(pid) = project_id {
            let rows = stmt.query_map(params![pid], Self::row_to_node)?;
            for row in rows {
                nodes.push(row?);
            }
        } else {
            let rows = stmt.query_map([], Self::row_to_node)?;
            for row in rows {
                nodes.push(row?);
            }
        }
        Ok(nodes)
    }

    fn nodes_needing_vision(&self) -> Result<Vec<GraphNode>, GraphError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM nodes
             WHERE json_extract(properties, '$.needsVision') = 1
                OR (label IN ('ImageFile', 'ThreeDFile')
                    AND json_extract(properties, '$.analyzed') = 0)",
        )?;
        let rows = stmt.query_map([], Self::row_to_node)?;
        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeLabel, RelType, Relationship};

    fn file_node(uuid: &str, name: &str, abs: &str) -> GraphNode {
        GraphNode::new(uuid, NodeLabel::File, name)
            .with_paths(name, abs)
            .with_hash("h1")
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        graph.nodes.push(file_node("file:a", "a.ts", "/p/a.ts"));
        graph
            .relationships
            .push(Relationship::new(RelType::BelongsTo, "file:a", "project:p"));

        store.upsert(&graph).unwrap();
        store.upsert(&graph).unwrap();

        assert_eq!(store.node_count().unwrap(), 1);
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_replaces_properties() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        graph
            .nodes
            .push(file_node("file:a", "a.ts", "/p/a.ts").prop("extension", "ts"));
        store.upsert(&graph).unwrap();

        let mut updated = Graph::new();
        let mut node = file_node("file:a", "a.ts", "/p/a.ts");
        node.content_hash = Some("h2".into());
        updated.nodes.push(node);
        store.upsert(&updated).unwrap();

        let fetched = store.node("file:a").unwrap().unwrap();
        assert_eq!(fetched.content_hash.as_deref(), Some("h2"));
        // Property replacement, not partial patch
        assert!(fetched.properties.get("extension").is_none());
    }

    #[test]
    fn test_delete_nodes_for_files_removes_subgraph() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        graph.nodes.push(file_node("file:a", "a.ts", "/p/a.ts"));
        let mut scope = GraphNode::new("scope-1", NodeLabel::Scope, "foo")
            .with_paths("a.ts", "/p/a.ts")
            .with_hash("sh");
        scope.properties.insert("kind".into(), "function".into());
        graph.nodes.push(scope);
        graph
            .relationships
            .push(Relationship::new(RelType::DefinedIn, "scope-1", "file:a"));
        store.upsert(&graph).unwrap();

        store
            .put_embedding(&EmbeddingRecord {
                node_uuid: "scope-1".into(),
                file: "/p/a.ts".into(),
                content_hash: "sh".into(),
                field: "content".into(),
                provider: "test".into(),
                model: "m".into(),
                vector: vec![0.1, 0.2],
            })
            .unwrap();

        let deleted = store
            .delete_nodes_for_files(&["/p/a.ts".to_string()], None)
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.node_count().unwrap(), 0);
        assert_eq!(store.edge_count().unwrap(), 0);
        assert!(store
            .embeddings_for_files(&["/p/a.ts".to_string()])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_scoped_to_project() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        let mut a = file_node("file:a", "a.ts", "/p/a.ts");
        a.project_id = "project:one".into();
        let mut b = file_node("file:b", "a.ts", "/p/a.ts");
        b.uuid = "file:b".into();
        b.project_id = "project:two".into();
        graph.nodes.push(a);
        graph.nodes.push(b);
        store.upsert(&graph).unwrap();

        let deleted = store
            .delete_nodes_for_files(&["/p/a.ts".to_string()], Some("project:one"))
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.node("file:b").unwrap().is_some());
    }

    #[test]
    fn test_scopes_for_files_reads_kind() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        let mut scope = GraphNode::new("scope-1", NodeLabel::Scope, "Widget")
            .with_paths("a.ts", "/p/a.ts");
        scope.properties.insert("kind".into(), "class".into());
        graph.nodes.push(scope);
        store.upsert(&graph).unwrap();

        let scopes = store.scopes_for_files(&["/p/a.ts".to_string()]).unwrap();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].kind, ScopeKind::Class);
        assert_eq!(scopes[0].name, "Widget");
    }

    #[test]
    fn test_dirty_nodes_tracks_missing_embeddings() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        graph.nodes.push(file_node("file:a", "a.ts", "/p/a.ts"));
        store.upsert(&graph).unwrap();

        assert_eq!(store.dirty_nodes(None).unwrap().len(), 1);

        store
            .put_embedding(&EmbeddingRecord {
                node_uuid: "file:a".into(),
                file: "/p/a.ts".into(),
                content_hash: "h1".into(),
                field: "content".into(),
                provider: "test".into(),
                model: "m".into(),
                vector: vec![1.0],
            })
            .unwrap();

        assert!(store.dirty_nodes(None).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_chunk_parents() {
        let mut store = SqliteGraphStore::in_memory().unwrap();
        let mut graph = Graph::new();
        graph
            .nodes
            .push(GraphNode::new("section:x", NodeLabel::MarkdownSection, "Intro"));
        store.upsert(&graph).unwrap();

        let map = store
            .resolve_chunk_parents(&["section:x".to_string(), "section:missing".to_string()])
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["section:x"].name, "Intro");
    }
}
