//! Lending service: issuing copies to readers and taking them back

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        book_return::{BookReturn, CreateReturn, ReturnDetails, ReturnQuery, UpdateReturn},
        issue::{default_due_date, CreateIssue, IssueDetails, IssueQuery, UpdateIssue},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    config: LendingConfig,
}

impl LendingService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self { repository, config }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn check_due_date(due_date: NaiveDate, today: NaiveDate) -> AppResult<()> {
        if due_date < today {
            return Err(AppError::Validation(
                "due_date: Due date cannot be in the past".to_string(),
            ));
        }
        Ok(())
    }

    // Issues

    /// List issues; readers only ever see their own
    pub async fn search_issues(
        &self,
        claims: &UserClaims,
        mut query: IssueQuery,
    ) -> AppResult<(Vec<IssueDetails>, i64)> {
        if !claims.is_librarian() {
            query.reader_id = Some(claims.user_id);
        }
        self.repository.issues.search(&query, Self::today()).await
    }

    pub async fn get_issue(&self, claims: &UserClaims, id: i32) -> AppResult<IssueDetails> {
        let issue = self.repository.issues.get_by_id(id, Self::today()).await?;
        claims.require_owner_or_librarian(issue.reader.id)?;
        Ok(issue)
    }

    /// Issue a copy of a book to a reader on behalf of the calling librarian
    pub async fn create_issue(
        &self,
        claims: &UserClaims,
        request: CreateIssue,
    ) -> AppResult<IssueDetails> {
        let today = Self::today();
        let due_date = request
            .due_date
            .unwrap_or_else(|| default_due_date(today, self.config.loan_period_days));
        Self::check_due_date(due_date, today)?;

        let result = self
            .repository
            .issues
            .create(
                &request,
                due_date,
                claims.user_id,
                today,
                self.config.max_open_issues,
            )
            .await;

        if let Err(AppError::BusinessRule(ref rule)) = result {
            tracing::info!(
                reader_id = request.reader_id,
                book_id = request.book_id,
                "Issue refused: {}",
                rule
            );
        }
        result
    }

    pub async fn update_issue(&self, id: i32, request: UpdateIssue) -> AppResult<IssueDetails> {
        let today = Self::today();
        Self::check_due_date(request.due_date, today)?;
        self.repository
            .issues
            .update_due_date(id, request.due_date, today)
            .await
    }

    pub async fn delete_issue(&self, id: i32) -> AppResult<()> {
        self.repository.issues.delete(id).await
    }

    // Returns

    /// List returns; readers only ever see their own
    pub async fn search_returns(
        &self,
        claims: &UserClaims,
        query: &ReturnQuery,
    ) -> AppResult<(Vec<ReturnDetails>, i64)> {
        let reader_id = (!claims.is_librarian()).then_some(claims.user_id);
        let (records, total) = self.repository.returns.search(query, reader_id).await?;
        Ok((self.with_issues(records).await?, total))
    }

    pub async fn get_return(&self, claims: &UserClaims, id: i32) -> AppResult<ReturnDetails> {
        let record = self.repository.returns.get_by_id(id).await?;
        let details = self.single(record).await?;
        claims.require_owner_or_librarian(details.issue.reader.id)?;
        Ok(details)
    }

    /// Register a return, charging a fine when the copy comes back late
    pub async fn create_return(
        &self,
        claims: &UserClaims,
        request: CreateReturn,
    ) -> AppResult<ReturnDetails> {
        let record = self
            .repository
            .returns
            .create(&request, claims.user_id, Self::today(), self.config.fine_per_day)
            .await?;
        self.single(record).await
    }

    pub async fn update_return(&self, id: i32, request: UpdateReturn) -> AppResult<ReturnDetails> {
        let record = self
            .repository
            .returns
            .update_condition(id, &request.condition)
            .await?;
        self.single(record).await
    }

    pub async fn delete_return(&self, id: i32) -> AppResult<()> {
        self.repository.returns.delete(id).await
    }

    async fn single(&self, record: BookReturn) -> AppResult<ReturnDetails> {
        self.with_issues(vec![record])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Issue of return missing".to_string()))
    }

    async fn with_issues(&self, records: Vec<BookReturn>) -> AppResult<Vec<ReturnDetails>> {
        let ids: Vec<i32> = records.iter().map(|r| r.issue_id).collect();
        let mut issues: HashMap<i32, IssueDetails> = self
            .repository
            .issues
            .get_many(&ids, Self::today())
            .await?
            .into_iter()
            .map(|issue| (issue.id, issue))
            .collect();

        records
            .into_iter()
            .map(|record| {
                let issue = issues.remove(&record.issue_id).ok_or_else(|| {
                    AppError::Internal(format!("Issue {} of return {} missing", record.issue_id, record.id))
                })?;
                Ok(ReturnDetails { record, issue })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_date_in_past_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        assert!(LendingService::check_due_date(today, today).is_ok());
        assert!(LendingService::check_due_date(today.succ_opt().unwrap(), today).is_ok());
        assert!(matches!(
            LendingService::check_due_date(today.pred_opt().unwrap(), today),
            Err(AppError::Validation(_))
        ));
    }
}
