//! Subjects, enrollments and results

use super::{ClientError, DevTrackClient};
use crate::types::{
    EnrollStudentRequest, Enrollment, EnrollmentResults, NewSubject, StudentEnrollment,
    StudentEnrollments, Subject,
};
use reqwest::Method;

impl DevTrackClient {
    /// Subjects visible to the current user
    pub async fn list_subjects(&self) -> Result<Vec<Subject>, ClientError> {
        let request = self.request(Method::GET, "/api/courses/subjects/");
        self.execute(request).await
    }

    pub async fn get_subject(&self, id: u64) -> Result<Subject, ClientError> {
        let request = self.request(Method::GET, &format!("/api/courses/subjects/{id}/"));
        self.execute(request).await
    }

    /// Create a subject (teachers and admins)
    pub async fn create_subject(&self, name: &str, code: &str) -> Result<Subject, ClientError> {
        let request = self
            .request(Method::POST, "/api/courses/subjects/")
            .json(&NewSubject {
                name: name.to_string(),
                code: code.to_string(),
            });
        self.execute(request).await
    }

    pub async fn list_enrollments(&self, subject_id: u64) -> Result<Vec<Enrollment>, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("/api/courses/subjects/{subject_id}/enrollments/"),
        );
        self.execute(request).await
    }

    /// Enroll a student by email
    pub async fn enroll_student(
        &self,
        subject_id: u64,
        student_email: &str,
    ) -> Result<Enrollment, ClientError> {
        let request = self
            .request(
                Method::POST,
                &format!("/api/courses/subjects/{subject_id}/enrollments/"),
            )
            .json(&EnrollStudentRequest {
                student_email: student_email.to_string(),
            });
        self.execute(request).await
    }

    /// Enrollments of the signed-in student, with their stats
    pub async fn my_enrollments(&self) -> Result<Vec<StudentEnrollment>, ClientError> {
        let request = self.request(Method::GET, "/api/courses/my-enrollments/");
        let page: StudentEnrollments = self.execute(request).await?;
        Ok(page.enrollments)
    }

    pub async fn enrollment_results(
        &self,
        enrollment_id: u64,
    ) -> Result<EnrollmentResults, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("/api/courses/enrollments/{enrollment_id}/results/"),
        );
        self.execute(request).await
    }
}
