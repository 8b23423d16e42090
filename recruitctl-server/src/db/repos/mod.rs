//! Per-entity tables: columns, payloads, and write invariants

pub mod applications;
pub mod athletes;
pub mod ball_knowledge;
pub mod campaign_leads;
pub mod campaigns;
pub mod clients;
pub mod coaches;
pub mod contacts;
pub mod import_jobs;
pub mod programs;
pub mod team_members;
pub mod universities;
pub mod university_jobs;

pub use applications::{Application, Applications};
pub use athletes::{Athlete, AthleteRepo, Athletes};
pub use ball_knowledge::{BallKnowledge, KnowledgeNote};
pub use campaign_leads::{bulk_create, BulkLeadsRequest, CampaignLead, CampaignLeads};
pub use campaigns::{Campaign, Campaigns};
pub use clients::{Client, Clients};
pub use coaches::{upsert_imported, Coach, Coaches, Upserted};
pub use contacts::{Contact, ContactAthlete, ContactRepo, Contacts, LinkAthlete};
pub use import_jobs::{CoachImportJob, CoachImportJobRepo, CoachImportJobs, JobProgress, NewImportJob};
pub use programs::{Program, Programs};
pub use team_members::{TeamMember, TeamMembers};
pub use universities::{Universities, University};
pub use university_jobs::{UniversityJob, UniversityJobs};
