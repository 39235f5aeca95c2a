//! List-operation options and the pagination protocol: stable ordering, an
//! opaque page token, and the SQL fragments that implement both.
use crate::errors::MetadataError;
use crate::metadata::{Artifact, Context, Execution};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Hard ceiling on a single page. Callers asking for more are clamped.
pub const MAX_PAGE_RESULT_SIZE: i64 = 100;

/// Field a list operation orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderByField {
    CreateTime,
    LastUpdateTime,
    Id,
}

impl OrderByField {
    /// Column backing the field in the node tables.
    pub fn column(self) -> &'static str {
        match self {
            Self::CreateTime => "create_time_since_epoch",
            Self::LastUpdateTime => "last_update_time_since_epoch",
            Self::Id => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: OrderByField,
    pub is_asc: bool,
}

/// Options of a paginated list operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListOperationOptions {
    pub max_result_size: i64,
    pub order_by: OrderBy,
    /// Opaque token from a previous page's result; absent on the first page.
    pub next_page_token: Option<String>,
}

impl ListOperationOptions {
    pub fn ordered_by(field: OrderByField, is_asc: bool) -> Self {
        Self {
            max_result_size: 20,
            order_by: OrderBy { field, is_asc },
            next_page_token: None,
        }
    }

    pub fn max_result_size(mut self, max_result_size: i64) -> Self {
        self.max_result_size = max_result_size;
        self
    }

    pub fn page_token(mut self, token: &str) -> Self {
        self.next_page_token = Some(token.to_owned());
        self
    }

    /// The options as they are embedded into a token: everything except the
    /// token itself.
    fn canonical(&self) -> Self {
        Self {
            next_page_token: None,
            ..self.clone()
        }
    }
}

impl Default for ListOperationOptions {
    fn default() -> Self {
        Self::ordered_by(OrderByField::Id, false)
    }
}

/// Cursor payload round-tripped through clients as URL-safe base64. The
/// embedded `set_options` copy lets the server reject tokens replayed with
/// different options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct NextPageToken {
    pub field_offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listed_ids: Vec<i64>,
    pub set_options: ListOperationOptions,
}

impl NextPageToken {
    /// Cursor for the first page: thresholds that no stored row can fail.
    fn initial(options: &ListOperationOptions) -> Self {
        let offset = if options.order_by.is_asc { 0 } else { i64::MAX };
        Self {
            field_offset: offset,
            id_offset: Some(offset),
            listed_ids: Vec::new(),
            set_options: options.canonical(),
        }
    }

    pub(crate) fn encode(&self) -> Result<String, MetadataError> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| MetadataError::internal(format!("cannot serialize page token: {}", e)))?;
        Ok(URL_SAFE.encode(payload))
    }

    pub(crate) fn decode(token: &str) -> Result<Self, MetadataError> {
        let payload = URL_SAFE.decode(token).map_err(|e| {
            MetadataError::invalid_argument(format!("cannot decode page token: {}", e))
        })?;
        serde_json::from_slice(&payload).map_err(|e| {
            MetadataError::invalid_argument(format!("cannot parse page token: {}", e))
        })
    }
}

/// Decodes the options' page token, or returns the initial cursor when no
/// token is set. Validation against the request options is separate (see
/// [`validate_list_options`]): the node lister re-issues the query with an
/// enlarged page size for next-page detection, and that internal copy must
/// still decode.
pub(crate) fn decode_list_cursor(
    options: &ListOperationOptions,
) -> Result<NextPageToken, MetadataError> {
    let Some(token) = &options.next_page_token else {
        return Ok(NextPageToken::initial(options));
    };
    NextPageToken::decode(token)
}

/// Rejects a page token that was issued for different options than the ones
/// it is replayed with.
pub(crate) fn validate_list_options(
    options: &ListOperationOptions,
) -> Result<(), MetadataError> {
    let Some(token) = &options.next_page_token else {
        return Ok(());
    };
    let decoded = NextPageToken::decode(token)?;
    if decoded.set_options != options.canonical() {
        return Err(MetadataError::invalid_argument(format!(
            "page token was issued for different list options: {:?}",
            decoded.set_options
        )));
    }
    Ok(())
}

/// Appends the `WHERE` fragment that resumes the scan at the cursor.
///
/// The comparison on the ordering column is inclusive so rows sharing the
/// boundary value are not skipped; the `id` condition then removes rows the
/// previous pages already returned.
pub(crate) fn append_ordering_threshold_clause(
    options: &ListOperationOptions,
    sql_clause: &mut String,
) -> Result<(), MetadataError> {
    let cursor = decode_list_cursor(options)?;
    let is_asc = options.order_by.is_asc;
    let field_op = if is_asc { ">=" } else { "<=" };
    let id_op = if is_asc { ">" } else { "<" };
    let column = options.order_by.field.column();

    match options.order_by.field {
        OrderByField::Id => {
            sql_clause.push_str(&format!(" `id` {} {} ", id_op, cursor.field_offset));
        }
        OrderByField::CreateTime | OrderByField::LastUpdateTime => {
            if !cursor.listed_ids.is_empty() {
                let ids = cursor
                    .listed_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                sql_clause.push_str(&format!(
                    " `{}` {} {} AND `id` NOT IN ({}) ",
                    column, field_op, cursor.field_offset, ids
                ));
            } else {
                let id_offset = cursor
                    .id_offset
                    .ok_or_else(|| MetadataError::invalid_argument("page token has no id offset"))?;
                sql_clause.push_str(&format!(
                    " `{}` {} {} AND `id` {} {} ",
                    column, field_op, cursor.field_offset, id_op, id_offset
                ));
            }
        }
    }
    Ok(())
}

/// Appends `ORDER BY`. The `id` tiebreak keeps the scan total even when the
/// ordering column has duplicates.
pub(crate) fn append_order_by_clause(
    options: &ListOperationOptions,
    sql_clause: &mut String,
) -> Result<(), MetadataError> {
    let direction = if options.order_by.is_asc { "ASC" } else { "DESC" };
    match options.order_by.field {
        OrderByField::Id => {
            sql_clause.push_str(&format!(" ORDER BY `id` {} ", direction));
        }
        field => {
            sql_clause.push_str(&format!(
                " ORDER BY `{}` {}, `id` {} ",
                field.column(),
                direction,
                direction
            ));
        }
    }
    Ok(())
}

/// Appends `LIMIT`, clamping at one past the page ceiling (the extra row is
/// how the node lister detects whether a next page exists).
pub(crate) fn append_limit_clause(
    options: &ListOperationOptions,
    sql_clause: &mut String,
) -> Result<(), MetadataError> {
    if options.max_result_size <= 0 {
        return Err(MetadataError::invalid_argument(format!(
            "max_result_size field value is required to be greater than 0 and \
             less than or equal to {}. Set value: {}",
            MAX_PAGE_RESULT_SIZE, options.max_result_size
        )));
    }
    let limit = options.max_result_size.min(MAX_PAGE_RESULT_SIZE + 1);
    sql_clause.push_str(&format!(" LIMIT {} ", limit));
    Ok(())
}

/// Node views the pagination layer needs: id plus the two orderable
/// timestamps.
pub trait ListableNode {
    fn node_id(&self) -> i64;
    fn create_time_millis(&self) -> i64;
    fn last_update_time_millis(&self) -> i64;
}

impl ListableNode for Artifact {
    fn node_id(&self) -> i64 {
        self.id.get()
    }

    fn create_time_millis(&self) -> i64 {
        self.create_time_since_epoch
    }

    fn last_update_time_millis(&self) -> i64 {
        self.last_update_time_since_epoch
    }
}

impl ListableNode for Execution {
    fn node_id(&self) -> i64 {
        self.id.get()
    }

    fn create_time_millis(&self) -> i64 {
        self.create_time_since_epoch
    }

    fn last_update_time_millis(&self) -> i64 {
        self.last_update_time_since_epoch
    }
}

impl ListableNode for Context {
    fn node_id(&self) -> i64 {
        self.id.get()
    }

    fn create_time_millis(&self) -> i64 {
        self.create_time_since_epoch
    }

    fn last_update_time_millis(&self) -> i64 {
        self.last_update_time_since_epoch
    }
}

/// Builds the token that resumes the scan after `nodes` (the page just
/// served, in result order).
///
/// For the unique `id` field the offset alone is enough. `create_time` pairs
/// the offset with an id cursor. `last_update_time` is mutable, so ties at
/// the boundary are carried as an explicit id exclusion list instead.
pub(crate) fn build_next_page_token<N: ListableNode>(
    nodes: &[N],
    options: &ListOperationOptions,
) -> Result<String, MetadataError> {
    let last = nodes
        .last()
        .ok_or_else(|| MetadataError::internal("cannot build a page token from an empty page"))?;
    let mut token = NextPageToken {
        field_offset: 0,
        id_offset: None,
        listed_ids: Vec::new(),
        set_options: options.canonical(),
    };
    match options.order_by.field {
        OrderByField::Id => {
            token.field_offset = last.node_id();
        }
        OrderByField::CreateTime => {
            token.field_offset = last.create_time_millis();
            token.id_offset = Some(last.node_id());
        }
        OrderByField::LastUpdateTime => {
            token.field_offset = last.last_update_time_millis();
            token.listed_ids = nodes
                .iter()
                .filter(|node| node.last_update_time_millis() == token.field_offset)
                .map(|node| node.node_id())
                .collect();
            // Ties can span pages: ids from the incoming cursor that still
            // sit on the boundary value stay excluded.
            if let Some(previous) = &options.next_page_token {
                if let Ok(previous) = NextPageToken::decode(previous) {
                    if previous.field_offset == token.field_offset {
                        for id in previous.listed_ids {
                            if !token.listed_ids.contains(&id) {
                                token.listed_ids.push(id);
                            }
                        }
                    }
                }
            }
        }
    }
    token.encode()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(field: OrderByField, is_asc: bool) -> ListOperationOptions {
        ListOperationOptions::ordered_by(field, is_asc).max_result_size(1)
    }

    fn with_token(mut options: ListOperationOptions, token: NextPageToken) -> ListOperationOptions {
        options.next_page_token = Some(token.encode().unwrap());
        options
    }

    fn token_for(options: &ListOperationOptions, field_offset: i64) -> NextPageToken {
        NextPageToken {
            field_offset,
            id_offset: None,
            listed_ids: Vec::new(),
            set_options: options.canonical(),
        }
    }

    #[test]
    fn ordering_where_clause_desc() {
        let base = options(OrderByField::CreateTime, false);
        let mut token = token_for(&base, 56894);
        token.id_offset = Some(100);
        let options = with_token(base, token);

        let mut clause = String::new();
        append_ordering_threshold_clause(&options, &mut clause).unwrap();
        assert_eq!(clause, " `create_time_since_epoch` <= 56894 AND `id` < 100 ");
    }

    #[test]
    fn ordering_where_clause_asc() {
        let base = options(OrderByField::CreateTime, true);
        let mut token = token_for(&base, 56894);
        token.id_offset = Some(100);
        let options = with_token(base, token);

        let mut clause = String::new();
        append_ordering_threshold_clause(&options, &mut clause).unwrap();
        assert_eq!(clause, " `create_time_since_epoch` >= 56894 AND `id` > 100 ");
    }

    #[test]
    fn ordering_on_last_update_time_desc() {
        let base = options(OrderByField::LastUpdateTime, false);
        let mut token = token_for(&base, 56894);
        token.listed_ids = vec![6, 5];
        let options = with_token(base, token);

        let mut clause = String::new();
        append_ordering_threshold_clause(&options, &mut clause).unwrap();
        assert_eq!(
            clause,
            " `last_update_time_since_epoch` <= 56894 AND `id` NOT IN (6,5) "
        );
    }

    #[test]
    fn ordering_where_clause_by_id() {
        let base = options(OrderByField::Id, false);
        let token = token_for(&base, 100);
        let options = with_token(base, token);

        let mut clause = String::new();
        append_ordering_threshold_clause(&options, &mut clause).unwrap();
        assert_eq!(clause, " `id` < 100 ");
    }

    #[test]
    fn first_page_uses_defaulted_cursor() {
        let mut clause = String::new();
        append_ordering_threshold_clause(&options(OrderByField::Id, true), &mut clause).unwrap();
        assert_eq!(clause, " `id` > 0 ");

        clause.clear();
        append_ordering_threshold_clause(&options(OrderByField::Id, false), &mut clause).unwrap();
        assert_eq!(clause, format!(" `id` < {} ", i64::MAX));
    }

    #[test]
    fn order_by_clause_keeps_the_id_tiebreak() {
        let mut clause = String::new();
        append_order_by_clause(&options(OrderByField::CreateTime, false), &mut clause).unwrap();
        assert_eq!(clause, " ORDER BY `create_time_since_epoch` DESC, `id` DESC ");

        clause.clear();
        append_order_by_clause(&options(OrderByField::CreateTime, true), &mut clause).unwrap();
        assert_eq!(clause, " ORDER BY `create_time_since_epoch` ASC, `id` ASC ");

        clause.clear();
        append_order_by_clause(&options(OrderByField::Id, false), &mut clause).unwrap();
        assert_eq!(clause, " ORDER BY `id` DESC ");
    }

    #[test]
    fn limit_clause_is_clamped() {
        let mut clause = String::new();
        append_limit_clause(&options(OrderByField::CreateTime, false), &mut clause).unwrap();
        assert_eq!(clause, " LIMIT 1 ");

        clause.clear();
        let big = options(OrderByField::Id, false).max_result_size(200);
        append_limit_clause(&big, &mut clause).unwrap();
        assert_eq!(clause, " LIMIT 101 ");

        let zero = options(OrderByField::Id, false).max_result_size(0);
        assert!(matches!(
            append_limit_clause(&zero, &mut String::new()),
            Err(MetadataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn token_round_trips() {
        let base = options(OrderByField::LastUpdateTime, false);
        let mut token = token_for(&base, 42);
        token.listed_ids = vec![9, 3];
        let encoded = token.encode().unwrap();
        assert_eq!(NextPageToken::decode(&encoded).unwrap(), token);
    }

    #[test]
    fn options_drift_is_rejected() {
        let issued_for = options(OrderByField::CreateTime, false);
        let token = token_for(&issued_for, 10);
        // Same token, replayed with a different ordering direction.
        let replay = with_token(options(OrderByField::CreateTime, true), token.clone());
        assert!(matches!(
            validate_list_options(&replay),
            Err(MetadataError::InvalidArgument(_))
        ));
        // Replayed with the options it was issued for, it passes.
        let same = with_token(options(OrderByField::CreateTime, false), token);
        assert!(validate_list_options(&same).is_ok());
    }

    #[test]
    fn garbage_token_is_invalid_argument() {
        let mut options = options(OrderByField::Id, false);
        options.next_page_token = Some("@@not-base64@@".to_owned());
        assert!(matches!(
            decode_list_cursor(&options),
            Err(MetadataError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_list_options(&options),
            Err(MetadataError::InvalidArgument(_))
        ));
    }
}
