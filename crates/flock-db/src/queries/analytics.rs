use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rusqlite::{Connection, params};

use flock_types::api::{
    AttendanceReport, Breakdown, DashboardStats, DonationReport, MembershipReport, MonthlyCount,
    RoleCount,
};
use flock_types::models::Role;

use crate::Database;
use crate::columns::{format_date, format_ts};
use crate::queries::attendance::{EVENT_STATS_SELECT, map_event_stats};

fn first_of_month(ts: &DateTime<Utc>) -> NaiveDate {
    ts.date_naive().with_day(1).unwrap_or_else(|| ts.date_naive())
}

/// Half-open bounds `[from 00:00, day after to 00:00)` covering both dates.
fn day_range(from: NaiveDate, to: NaiveDate) -> Result<(String, String)> {
    let end = to.succ_opt().ok_or_else(|| anyhow!("date out of range: {to}"))?;
    Ok((format_date(&from), format_date(&end)))
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<i64> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

impl Database {
    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let month_start = format_date(&first_of_month(&now));
        let now_ts = format_ts(&now);
        let thirty_days_ago = format_ts(&(now - Duration::days(30)));

        self.with_conn(|conn| {
            Ok(DashboardStats {
                total_members: count(conn, "SELECT COUNT(*) FROM users", [])?,
                new_members_this_month: count(
                    conn,
                    "SELECT COUNT(*) FROM users WHERE created_at >= ?1",
                    [&month_start],
                )?,
                total_donations_cents: count(
                    conn,
                    "SELECT COALESCE(SUM(amount_cents), 0) FROM donations",
                    [],
                )?,
                donations_this_month_cents: count(
                    conn,
                    "SELECT COALESCE(SUM(amount_cents), 0) FROM donations WHERE created_at >= ?1",
                    [&month_start],
                )?,
                upcoming_events: count(
                    conn,
                    "SELECT COUNT(*) FROM events WHERE starts_at >= ?1",
                    [&now_ts],
                )?,
                open_prayers: count(conn, "SELECT COUNT(*) FROM prayers WHERE status = 'open'", [])?,
                approved_testimonies: count(
                    conn,
                    "SELECT COUNT(*) FROM testimonies WHERE approved = 1",
                    [],
                )?,
                pending_testimonies: count(
                    conn,
                    "SELECT COUNT(*) FROM testimonies WHERE approved = 0",
                    [],
                )?,
                check_ins_last_30_days: count(
                    conn,
                    "SELECT COUNT(*) FROM attendance WHERE checked_in_at >= ?1",
                    [&thirty_days_ago],
                )?,
            })
        })
    }

    /// New members per calendar month for the `months` months ending with the
    /// current one, oldest first. Months without sign-ups report 0.
    pub fn member_growth(&self, months: u32, now: DateTime<Utc>) -> Result<Vec<MonthlyCount>> {
        let current = first_of_month(&now);
        let start = current
            .checked_sub_months(Months::new(months.saturating_sub(1)))
            .ok_or_else(|| anyhow!("growth window out of range"))?;

        let mut out: Vec<MonthlyCount> = (0..months)
            .filter_map(|i| start.checked_add_months(Months::new(i)))
            .map(|m| MonthlyCount { month: m.format("%Y-%m").to_string(), count: 0 })
            .collect();

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT strftime('%Y-%m', created_at), COUNT(*)
                 FROM users
                 WHERE created_at >= ?1
                 GROUP BY 1",
            )?;
            let rows = stmt
                .query_map([format_date(&start)], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        for (month, n) in rows {
            if let Some(slot) = out.iter_mut().find(|m| m.month == month) {
                slot.count = n;
            }
        }
        Ok(out)
    }

    // -- Reports --

    pub fn donation_report(&self, from: NaiveDate, to: NaiveDate) -> Result<DonationReport> {
        let (start, end) = day_range(from, to)?;
        self.with_conn(|conn| {
            let (total_cents, count): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(amount_cents), 0), COUNT(*)
                 FROM donations WHERE created_at >= ?1 AND created_at < ?2",
                [&start, &end],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let breakdown = |sql: &str| -> Result<Vec<Breakdown>> {
                let mut stmt = conn.prepare(sql)?;
                let rows = stmt
                    .query_map([&start, &end], |row| {
                        Ok(Breakdown {
                            label: row.get(0)?,
                            total_cents: row.get(1)?,
                            count: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            };

            let by_method = breakdown(
                "SELECT method, SUM(amount_cents), COUNT(*)
                 FROM donations WHERE created_at >= ?1 AND created_at < ?2
                 GROUP BY method ORDER BY 2 DESC, method",
            )?;
            let by_project = breakdown(
                "SELECT COALESCE(p.name, 'Unassigned'), SUM(d.amount_cents), COUNT(*)
                 FROM donations d
                 LEFT JOIN donation_projects p ON p.id = d.project_id
                 WHERE d.created_at >= ?1 AND d.created_at < ?2
                 GROUP BY 1 ORDER BY 2 DESC, 1",
            )?;

            Ok(DonationReport { total_cents, count, by_method, by_project })
        })
    }

    /// Events that start within the range, with their check-in counts.
    pub fn attendance_report(&self, from: NaiveDate, to: NaiveDate) -> Result<AttendanceReport> {
        let (start, end) = day_range(from, to)?;
        let events = self.with_conn(|conn| {
            let sql = format!(
                "{EVENT_STATS_SELECT}
                 WHERE e.starts_at >= ?1 AND e.starts_at < ?2
                 GROUP BY e.id
                 ORDER BY e.starts_at"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![start, end], map_event_stats)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        let total_check_ins = events.iter().map(|e| e.total).sum();
        Ok(AttendanceReport { total_check_ins, events })
    }

    /// Members who joined within the range, plus the current head count per role.
    pub fn membership_report(&self, from: NaiveDate, to: NaiveDate) -> Result<MembershipReport> {
        let (start, end) = day_range(from, to)?;
        self.with_conn(|conn| {
            let new_members = count(
                conn,
                "SELECT COUNT(*) FROM users WHERE created_at >= ?1 AND created_at < ?2",
                [&start, &end],
            )?;

            let mut by_role = Vec::with_capacity(Role::ALL.len());
            for role in Role::ALL {
                by_role.push(RoleCount {
                    role: *role,
                    count: count(conn, "SELECT COUNT(*) FROM users WHERE role = ?1", [role.as_str()])?,
                });
            }
            Ok(MembershipReport { new_members, by_role })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewDonation;
    use crate::queries::test_support::{backdate, db, user};
    use chrono::TimeZone;
    use flock_types::models::DonationMethod;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn give(db: &Database, donor: Uuid, cents: i64, method: DonationMethod, ts: &str) {
        let id = Uuid::new_v4();
        db.create_donation(&NewDonation {
            id,
            user_id: donor,
            project_id: None,
            amount_cents: cents,
            currency: "USD",
            method,
            note: None,
        })
        .unwrap();
        backdate(db, "donations", "created_at", id, ts);
    }

    #[test]
    fn growth_is_zero_filled_oldest_first() {
        let db = db();
        let a = user(&db, "Ruth", Role::Member);
        let b = user(&db, "Naomi", Role::Member);
        let c = user(&db, "Boaz", Role::Member);
        backdate(&db, "users", "created_at", a, "2026-05-03 09:00:00");
        backdate(&db, "users", "created_at", b, "2026-07-20 09:00:00");
        backdate(&db, "users", "created_at", c, "2025-01-01 09:00:00");

        let growth = db.member_growth(4, at(2026, 7, 31)).unwrap();
        let months: Vec<_> = growth.iter().map(|m| (m.month.as_str(), m.count)).collect();
        assert_eq!(months, [("2026-04", 0), ("2026-05", 1), ("2026-06", 0), ("2026-07", 1)]);
    }

    #[test]
    fn dashboard_counts_this_month() {
        let db = db();
        let donor = user(&db, "Lydia", Role::Member);
        backdate(&db, "users", "created_at", donor, "2026-03-10 08:00:00");
        give(&db, donor, 50_00, DonationMethod::Card, "2026-03-11 10:00:00");
        give(&db, donor, 20_00, DonationMethod::Cash, "2026-02-11 10:00:00");

        let stats = db.dashboard_stats(at(2026, 3, 15)).unwrap();
        assert_eq!(stats.total_members, 1);
        assert_eq!(stats.new_members_this_month, 1);
        assert_eq!(stats.total_donations_cents, 70_00);
        assert_eq!(stats.donations_this_month_cents, 50_00);
        assert_eq!(stats.upcoming_events, 0);
    }

    #[test]
    fn donation_report_range_includes_last_day() {
        let db = db();
        let donor = user(&db, "Lydia", Role::Member);
        give(&db, donor, 10_00, DonationMethod::Card, "2026-01-01 00:00:00");
        give(&db, donor, 15_00, DonationMethod::Card, "2026-01-31 23:59:59");
        give(&db, donor, 5_00, DonationMethod::Cash, "2026-01-15 12:00:00");
        give(&db, donor, 99_00, DonationMethod::Cash, "2026-02-01 00:00:00");

        let report = db.donation_report(date(2026, 1, 1), date(2026, 1, 31)).unwrap();
        assert_eq!(report.count, 3);
        assert_eq!(report.total_cents, 30_00);
        assert_eq!(report.by_method[0].label, "card");
        assert_eq!(report.by_method[0].total_cents, 25_00);
        assert_eq!(report.by_project.len(), 1);
        assert_eq!(report.by_project[0].label, "Unassigned");
    }

    #[test]
    fn membership_report_lists_every_role() {
        let db = db();
        user(&db, "Peter", Role::Pastor);
        user(&db, "Andrew", Role::Member);
        user(&db, "James", Role::Member);

        let today = Utc::now().date_naive();
        let report = db.membership_report(today, today).unwrap();
        assert_eq!(report.new_members, 3);
        assert_eq!(report.by_role.len(), Role::ALL.len());
        let members = report.by_role.iter().find(|r| r.role == Role::Member).unwrap();
        assert_eq!(members.count, 2);
    }
}
